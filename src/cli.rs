use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "fearqc",
    version,
    about = "QC tooling for feature relationship (FeaR) load files"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Qc(QcArgs),
    Status(StatusArgs),
}

#[derive(Args, Debug, Clone)]
pub struct QcArgs {
    /// Tab-delimited FeaR input file (header line required).
    pub input: PathBuf,

    #[arg(long)]
    pub db_path: PathBuf,

    #[arg(long, default_value = ".")]
    pub output_dir: PathBuf,

    #[arg(long)]
    pub qc_report_path: Option<PathBuf>,

    #[arg(long)]
    pub warning_report_path: Option<PathBuf>,

    #[arg(long)]
    pub delete_report_path: Option<PathBuf>,

    #[arg(long)]
    pub delete_sql_path: Option<PathBuf>,

    #[arg(long)]
    pub staging_bcp_path: Option<PathBuf>,

    #[arg(long, default_value = "fear_mgi_id_staging")]
    pub staging_table: String,

    #[arg(long)]
    pub run_manifest_path: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    #[arg(long, default_value = ".")]
    pub output_dir: PathBuf,

    #[arg(long)]
    pub db_path: Option<PathBuf>,

    #[arg(long)]
    pub run_manifest_path: Option<PathBuf>,
}
