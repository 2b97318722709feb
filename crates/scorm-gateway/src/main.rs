//! SCORM Gateway - upload and manage SCORM packages

use clap::Parser;
use scorm_gateway::{run_server, GatewayConfig, StorageBackend};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "scorm-gateway")]
#[command(about = "Upload, list and delete SCORM packages")]
#[command(version)]
struct Args {
    /// Host to bind to
    #[arg(short = 'H', long, default_value = "0.0.0.0", env = "HOST")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value = "3000", env = "PORT")]
    port: u16,

    /// Storage backend
    #[arg(long, value_enum, default_value = "local", env = "STORAGE_BACKEND")]
    storage: StorageBackend,

    /// Cloud account name
    #[arg(long, env = "CLOUDINARY_CLOUD_NAME")]
    cloud_name: Option<String>,

    /// Cloud API key
    #[arg(long, env = "CLOUDINARY_API_KEY")]
    cloud_api_key: Option<String>,

    /// Cloud API secret
    #[arg(long, env = "CLOUDINARY_API_SECRET", hide_env_values = true)]
    cloud_api_secret: Option<String>,

    /// Cloud API base URL
    #[arg(long, default_value = "https://api.cloudinary.com/v1_1", env = "CLOUDINARY_API_URL")]
    cloud_api_url: String,

    /// Cloud key prefix for stored folders
    #[arg(long, default_value = "scorm_packages", env = "CLOUDINARY_ROOT_PREFIX")]
    cloud_root_prefix: String,

    /// Frontend origin allowed by CORS
    #[arg(long, default_value = "http://localhost:5173", env = "CORS_ORIGIN")]
    cors_origin: String,

    /// Local storage root
    #[arg(long, default_value = "public", env = "PUBLIC_DIR")]
    public_dir: PathBuf,

    /// Directory for in-flight chunks
    #[arg(long, default_value = "temp", env = "TEMP_DIR")]
    temp_dir: PathBuf,

    /// Directory for merged chunked uploads
    #[arg(long, default_value = "uploads", env = "UPLOADS_DIR")]
    uploads_dir: PathBuf,

    /// Folder used when an upload names none
    #[arg(long, default_value = "scorm_files", env = "DEFAULT_FOLDER")]
    default_folder: String,

    /// Maximum upload body size in bytes (0 disables the limit)
    #[arg(long, default_value_t = 150 * 1024 * 1024, env = "MAX_UPLOAD_SIZE")]
    max_upload_size: usize,

    /// Maximum chunk request size in bytes (0 disables the limit)
    #[arg(long, default_value_t = 150 * 1024 * 1024, env = "MAX_CHUNK_SIZE")]
    max_chunk_size: usize,

    /// Maximum number of chunks per file
    #[arg(long, default_value_t = scorm_gateway::chunks::DEFAULT_MAX_CHUNKS, env = "MAX_CHUNKS")]
    max_chunks: u32,

    /// Enable debug logging
    #[arg(short, long, env = "SCORM_DEBUG")]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Setup logging
    let log_level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("scorm_gateway={0},scorm_storage={0},tower_http=debug", log_level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting SCORM Gateway on {}:{}", args.host, args.port);
    tracing::info!("CORS origin: {}", args.cors_origin);

    if args.max_upload_size == 0 {
        tracing::warn!("Upload size limit is DISABLED");
    }

    let config = GatewayConfig {
        host: args.host,
        port: args.port,
        storage_backend: args.storage,
        cloud_api_url: args.cloud_api_url,
        cloud_name: args.cloud_name,
        cloud_api_key: args.cloud_api_key,
        cloud_api_secret: args.cloud_api_secret,
        cloud_root_prefix: args.cloud_root_prefix,
        cors_origin: args.cors_origin,
        public_dir: args.public_dir,
        temp_dir: args.temp_dir,
        uploads_dir: args.uploads_dir,
        default_folder: args.default_folder,
        max_upload_size: args.max_upload_size,
        max_chunk_size: args.max_chunk_size,
        max_chunks: args.max_chunks,
        ..Default::default()
    };

    run_server(config).await
}
