use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
    /// S3 bucket holding uploaded flight data
    #[arg(env = "S3_BUCKET_NAME", long, short)]
    pub bucket: String,
}

#[derive(Subcommand)]
pub enum Command {
    /// List uploaded data files, newest first [alias: ls]
    #[command(alias = "ls")]
    List,
    /// Delete data files and their metadata [alias: rm]
    #[command(alias = "rm")]
    Delete {
        #[arg(required = true)]
        ids: Vec<String>,
    },
}
