mod cli;
mod s3;

use anyhow::Result;
use bytesize::ByteSize;
use clap::Parser;
use cli_table::{
    format::{Border, Justify, Separator},
    Cell, Table,
};
use futures_util::{stream::FuturesUnordered, TryStreamExt};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

use crate::cli::{Args, Command};

fn format_timestamp(timestamp: i64) -> String {
    OffsetDateTime::from_unix_timestamp(timestamp)
        .ok()
        .and_then(|at| at.format(&Rfc3339).ok())
        .unwrap_or_else(|| timestamp.to_string())
}

async fn list(s3_client: &aws_sdk_s3::Client, bucket: &str) -> Result<()> {
    let mut files = s3::list_data_files(s3_client, bucket).await?;
    files.sort_by(|a, b| b.file.uploaded_at.cmp(&a.file.uploaded_at));

    let table = files
        .into_iter()
        .map(|stored| {
            vec![
                stored.id.cell(),
                stored.file.name.cell(),
                stored.file.filename.cell(),
                ByteSize(stored.file.size as u64)
                    .to_string()
                    .cell()
                    .justify(Justify::Right),
                format_timestamp(stored.file.uploaded_at).cell(),
            ]
        })
        .collect::<Vec<_>>()
        .table()
        .title(vec![
            "ID".cell(),
            "NAME".cell(),
            "FILENAME".cell(),
            "SIZE".cell(),
            "UPLOADED AT".cell(),
        ])
        .separator(
            Separator::builder()
                .column(None)
                .row(None)
                .title(None)
                .build(),
        )
        .border(Border::builder().build());
    cli_table::print_stdout(table)?;
    Ok(())
}

async fn delete(s3_client: &aws_sdk_s3::Client, bucket: &str, ids: &[String]) -> Result<()> {
    ids.iter()
        .map(|id| async move {
            // metadata first so the dashboard stops listing it
            s3::delete_metadata(s3_client, bucket, id).await?;
            s3::delete_file(s3_client, bucket, id).await?;
            println!("{id} deleted");
            Ok(())
        })
        .collect::<FuturesUnordered<_>>()
        .try_collect::<()>()
        .await
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let aws_config = aws_config::load_from_env().await;
    let s3_client = aws_sdk_s3::Client::new(&aws_config);

    match args.command {
        Command::List => list(&s3_client, &args.bucket).await?,
        Command::Delete { ids } => delete(&s3_client, &args.bucket, &ids).await?,
    }

    Ok(())
}
