use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "smartmedia")]
#[command(author, version, about = "Media conversion tracking and transcoding cost estimation")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the conversion record for a stored file
    Create {
        /// Path hash of the stored file
        path_hash: String,
    },

    /// Create conversions for files with metadata but no conversion
    Backfill,

    /// Send accepted conversions to the remote pipeline
    Dispatch,

    /// Apply remote status messages to in-progress conversions
    Reconcile,

    /// Run backfill, dispatch and reconcile once
    Run,

    /// Show the conversion status of a stored file
    Status {
        /// Path hash of the stored file
        path_hash: String,

        /// Create the conversion if there is none yet
        #[arg(long)]
        trigger: bool,
    },

    /// Put a local file into the blob store
    Import {
        /// File to import
        #[arg(required = true)]
        file: PathBuf,

        /// Store path (defaults to the file name)
        #[arg(long)]
        path: Option<String>,
    },

    /// Record extracted media metadata for a stored file
    Metadata {
        /// Path hash of the stored file
        path_hash: String,

        /// Height of the first video stream in pixels, 0 for audio
        #[arg(long)]
        height: u32,

        /// Duration in seconds
        #[arg(long)]
        duration: f64,

        #[arg(long, default_value = "1")]
        video_streams: u32,

        #[arg(long, default_value = "1")]
        audio_streams: u32,
    },

    /// Record an inbound status message from a remote service
    Notify {
        /// Remote process name, e.g. elastic_transcoder
        process: String,

        /// Message status, e.g. COMPLETED
        status: String,

        /// Content hash the message is about
        object_key: String,

        /// Message id (generated if omitted)
        #[arg(long)]
        message_id: Option<String>,
    },

    /// Estimate the transcoding cost of a media file
    Estimate {
        /// Source height in pixels, 0 for audio
        #[arg(long)]
        height: u32,

        /// Duration in seconds
        #[arg(long)]
        duration: f64,

        #[arg(long, default_value = "1")]
        video_streams: u32,

        #[arg(long, default_value = "1")]
        audio_streams: u32,

        /// Preset ids (defaults to the configured transcode presets)
        #[arg(long = "preset")]
        presets: Vec<String>,

        /// Pricing region (defaults to the configured region)
        #[arg(long)]
        region: Option<String>,
    },

    /// Estimate the transcoding cost of an existing conversion
    EstimateRecord {
        /// Path hash of the stored file
        path_hash: String,
    },

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
