use anyhow::Result;
use aws_sdk_s3::{
    error::SdkError, operation::get_object::GetObjectError, primitives::ByteStream, Client,
};
use futures_util::{TryFutureExt, TryStreamExt};
use rda_core::types::{DataFile, StoredDataFile};

use crate::config::CONFIG;

fn key_file(id: &str) -> String {
    format!("file/{id}.csv")
}

fn key_metadata(id: &str) -> String {
    format!("metadata/{id}.json")
}

/// `None` when the key does not exist, e.g. removed by a concurrent delete.
async fn get_object(s3_client: &Client, key: &str) -> Result<Option<ByteStream>> {
    let resp = s3_client
        .get_object()
        .bucket(&CONFIG.s3_bucket_name)
        .key(key)
        .send()
        .await;
    match resp {
        Ok(resp) => Ok(Some(resp.body)),
        Err(SdkError::ServiceError(error)) if matches!(error.err(), GetObjectError::NoSuchKey(_)) => {
            Ok(None)
        }
        Err(error) => Err(error.into()),
    }
}

async fn get_bytes(s3_client: &Client, key: &str) -> Result<Option<Vec<u8>>> {
    match get_object(s3_client, key).await? {
        Some(body) => Ok(Some(body.collect().await?.to_vec())),
        None => Ok(None),
    }
}

/// Builds the listing entry for one metadata object. Missing or unreadable
/// metadata is skipped.
fn parse_metadata(id: &str, body: Option<&[u8]>) -> Option<StoredDataFile> {
    let Some(body) = body else {
        tracing::debug!(id, "metadata vanished while listing");
        return None;
    };
    match serde_json::from_slice::<DataFile>(body) {
        Ok(file) => Some(StoredDataFile {
            id: id.to_string(),
            file,
        }),
        Err(error) => {
            tracing::warn!(%error, id, "skipping unreadable metadata");
            None
        }
    }
}

pub async fn list_data_files(s3_client: &Client) -> Result<Vec<StoredDataFile>> {
    s3_client
        .list_objects_v2()
        .bucket(&CONFIG.s3_bucket_name)
        .prefix("metadata/")
        .into_paginator()
        .send()
        .err_into::<anyhow::Error>()
        .map_ok(|output| {
            futures_util::stream::iter(
                output
                    .contents
                    .unwrap_or_default()
                    .into_iter()
                    .map(Result::<_, anyhow::Error>::Ok),
            )
        })
        .try_flatten()
        .try_filter_map(|content| async move {
            let Some(key) = content.key() else {
                return Ok(None);
            };
            let Some(id) = key
                .strip_prefix("metadata/")
                .and_then(|name| name.strip_suffix(".json"))
            else {
                return Ok(None);
            };
            let body = get_bytes(s3_client, key).await?;
            Ok(parse_metadata(id, body.as_deref()))
        })
        .try_collect()
        .await
}

/// The stored CSV body, or `None` for an unknown id.
pub async fn get_file(s3_client: &Client, id: &str) -> Result<Option<Vec<u8>>> {
    get_bytes(s3_client, &key_file(id)).await
}

pub async fn upload_metadata(s3_client: &Client, id: &str, file: &DataFile) -> Result<()> {
    s3_client
        .put_object()
        .bucket(&CONFIG.s3_bucket_name)
        .key(key_metadata(id))
        .content_type("application/json")
        .body(serde_json::to_vec(file)?.into())
        .send()
        .await?;
    Ok(())
}

pub async fn upload_file(s3_client: &Client, id: &str, body: Vec<u8>) -> Result<()> {
    s3_client
        .put_object()
        .bucket(&CONFIG.s3_bucket_name)
        .key(key_file(id))
        .content_type("text/csv")
        .body(body.into())
        .send()
        .await?;
    Ok(())
}

async fn delete_object(s3_client: &Client, key: String) -> Result<()> {
    s3_client
        .delete_object()
        .bucket(&CONFIG.s3_bucket_name)
        .key(key)
        .send()
        .await?;
    Ok(())
}

/// Metadata goes first so the dashboard stops listing the file.
pub async fn delete_data_file(s3_client: &Client, id: &str) -> Result<()> {
    delete_object(s3_client, key_metadata(id)).await?;
    delete_object(s3_client, key_file(id)).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vanished_metadata_is_skipped() {
        assert_eq!(parse_metadata("abc", None), None);
    }

    #[test]
    fn unreadable_metadata_is_skipped() {
        assert_eq!(parse_metadata("abc", Some(b"{not json".as_slice())), None);
    }

    #[test]
    fn metadata_is_listed_under_its_id() {
        let body = br#"{"name":"launch","filename":"l.csv","size":3,"uploaded_at":0}"#;
        let stored = parse_metadata("abc", Some(body.as_slice())).unwrap();
        assert_eq!(stored.id, "abc");
        assert_eq!(stored.file.name, "launch");
        assert_eq!(stored.file.description, "");
    }
}
