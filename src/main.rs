use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
mod auth;
use imgvault::crypto::PBKDF2_ITERATIONS;
use imgvault::{ImageVault, RecordStore, Session, default_db_path};
use std::path::PathBuf;

fn resolve_db(path: Option<PathBuf>) -> Result<PathBuf> {
    match path {
        Some(p) => Ok(p),
        None => default_db_path(),
    }
}

#[derive(Debug, Parser)]
#[command(name = "imgvault")]
#[command(version, about = "Passphrase-protected, offline image vault.")]
struct Cli {
    /// Path to the image database
    #[arg(long, global = true, value_name = "PATH", env = "IMGVAULT_DB")]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Encrypts and stores images (.jpg, .jpeg, .png)
    #[command(arg_required_else_help = true)]
    Import {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Lists stored image ids; nothing is decrypted
    List,

    /// Decrypts an image and writes it as PNG
    #[command(arg_required_else_help = true)]
    Export { id: i64, output: PathBuf },

    /// Deletes an image by id
    #[command(arg_required_else_help = true)]
    Remove { id: i64 },

    /// Decrypts every image and reports the ones that fail
    Verify,

    /// Shows information about the database
    Info,
}

fn unlock(store: RecordStore, confirm: bool) -> Result<ImageVault> {
    let passphrase = auth::read_passphrase(confirm)?;
    let session = Session::new(passphrase)?.cache_keys();
    Ok(ImageVault::new(store, session))
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Cli::parse();
    let db = resolve_db(args.db)?;
    let store = RecordStore::open(&db)
        .with_context(|| format!("failed to open image database {}", db.display()))?;

    match args.command {
        Commands::Import { files } => {
            let first_import = store.is_empty()?;
            let vault = unlock(store, first_import)?;
            for file in &files {
                let id = vault.import_file(file)?;
                println!("imported '{}' as #{id}", file.display());
            }
        }
        Commands::List => {
            let sizes = store.blob_sizes()?;
            if sizes.is_empty() {
                println!("No images stored.");
                return Ok(());
            }

            let id_width = sizes
                .iter()
                .map(|(id, _)| id.to_string().len())
                .chain(std::iter::once("Id".len()))
                .max()
                .unwrap_or(2);

            println!("{:<id_width$}  Bytes", "Id");
            println!("{:-<id_width$}  -----", "");
            for (id, len) in sizes {
                println!("{id:<id_width$}  {len}");
            }
        }
        Commands::Export { id, output } => {
            let vault = unlock(store, false)?;
            let info = vault.export(id, &output)?;
            println!(
                "exported #{id} ({}x{}) to '{}'",
                info.width,
                info.height,
                output.display()
            );
        }
        Commands::Remove { id } => {
            store.remove(id)?;
            println!("image #{id} removed successfully");
        }
        Commands::Verify => {
            let total = store.len()?;
            let vault = unlock(store, false)?;
            let gallery = vault.gallery()?;

            println!(
                "{} images loaded, {} skipped",
                gallery.len(),
                gallery.skipped().len()
            );
            for skipped in gallery.skipped() {
                println!("  #{}: {}", skipped.id, skipped.reason);
            }

            if total > 0 && gallery.is_empty() {
                bail!("no image could be decrypted; possibly wrong passphrase");
            }
        }
        Commands::Info => {
            println!("database: {}", db.display());
            println!("images:   {}", store.len()?);
            println!("kdf:      PBKDF2-HMAC-SHA256, {PBKDF2_ITERATIONS} iterations");
            println!("cipher:   AES-256-CTR, 16-byte random salt and IV per image");
        }
    }

    Ok(())
}
