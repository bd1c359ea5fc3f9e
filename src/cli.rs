use std::path::PathBuf;

use anyhow::{bail, Context};
use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};
use clap::{Parser, Subcommand};
use file_share::catalog::{FileCatalog, HttpFileStorage, SortDirection, SortKey, UploadCandidate, ViewState};
use file_share::{Config, FileCategory, NewShare, ReadPolicy, SharePatch, ShareRegistry, SharedFile};

#[derive(Parser)]
#[command(name = "file-share")]
#[command(about = "Share links and uploaded file catalog", long_about = None)]
pub struct Cli {
    /// TOML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding shared-files.json
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Base URL of the file API
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Treat an unreadable share store as empty instead of failing
    #[arg(long, global = true)]
    lenient_reads: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    pub fn load_config(&self) -> anyhow::Result<Config> {
        let mut config = Config::load(self.config.as_deref())?;
        if let Some(dir) = &self.data_dir {
            config.data_dir = dir.clone();
        }
        if let Some(url) = &self.api_url {
            config.api_base_url = url.clone();
        }
        if self.lenient_reads {
            config.read_policy = ReadPolicy::Lenient;
        }
        Ok(config)
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage share links
    #[command(subcommand)]
    Share(ShareCommand),

    /// Browse and manage files through the file API
    #[command(subcommand)]
    Files(FilesCommand),
}

#[derive(Subcommand)]
pub enum ShareCommand {
    /// Create the share store if it does not exist
    Init,

    /// Share a file
    Create {
        filename: String,

        /// Minutes until the link expires; negative values create an expired link
        #[arg(long, allow_negative_numbers = true)]
        expires_in_minutes: Option<i64>,

        #[arg(long)]
        password: Option<String>,

        #[arg(long, default_value = "cli")]
        created_by: String,
    },

    /// List all share links
    List,

    /// Show one share link
    Show { id: String },

    /// Change a share link
    Update {
        id: String,

        #[arg(long)]
        filename: Option<String>,

        #[arg(long, allow_negative_numbers = true, conflicts_with = "never_expires")]
        expires_in_minutes: Option<i64>,

        #[arg(long)]
        never_expires: bool,

        #[arg(long, conflicts_with = "remove_password")]
        password: Option<String>,

        #[arg(long)]
        remove_password: bool,
    },

    /// Remove a share link
    Delete { id: String },

    /// Resolve a share link, counting the access
    Open {
        id: String,

        #[arg(long)]
        password: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum FilesCommand {
    /// List uploaded files
    List {
        /// Case-insensitive match on name or content
        #[arg(short, long, default_value = "")]
        query: String,

        /// Keep files of these categories (label or short name, repeatable)
        #[arg(long = "category")]
        categories: Vec<FileCategory>,

        /// Keep files with these extensions (repeatable)
        #[arg(long = "extension")]
        extensions: Vec<String>,

        #[arg(long, default_value_t = SortKey::Date)]
        sort: SortKey,

        /// Ascending order (default is descending)
        #[arg(long)]
        asc: bool,
    },

    /// Upload files
    Upload {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Delete a file
    Delete { name: String },

    /// Rename a file and/or replace its content
    Edit {
        name: String,

        #[arg(long)]
        rename: Option<String>,

        #[arg(long)]
        content_file: Option<PathBuf>,
    },
}

pub async fn execute_command(config: &Config, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Share(command) => execute_share(config, command).await,
        Commands::Files(command) => execute_files(config, command).await,
    }
}

async fn execute_share(config: &Config, command: ShareCommand) -> anyhow::Result<()> {
    let registry = ShareRegistry::open(&config.data_dir, config.read_policy)
        .await
        .context("opening share store")?;

    match command {
        ShareCommand::Init => {
            println!("share store ready at {}", registry.backend().file_path().display());
        }
        ShareCommand::Create {
            filename,
            expires_in_minutes,
            password,
            created_by,
        } => {
            let mut share = NewShare::new(filename, created_by);
            if let Some(minutes) = expires_in_minutes {
                share = share.expires_at(expiry_in(minutes)?);
            }
            if let Some(password) = password {
                share = share.with_password(password);
            }
            let record = registry.create(share).await?;
            println!("{}", format_share(&record));
        }
        ShareCommand::List => {
            let records = registry.list_all().await?;
            if registry.is_degraded() {
                eprintln!("warning: share store could not be read, showing no records");
            }
            for record in &records {
                println!("{}", format_share(record));
            }
        }
        ShareCommand::Show { id } => match registry.get_by_id(&id).await? {
            Some(record) => println!("{}", format_share(&record)),
            None => bail!("share {} not found", id),
        },
        ShareCommand::Update {
            id,
            filename,
            expires_in_minutes,
            never_expires,
            password,
            remove_password,
        } => {
            let expires_at = match expires_in_minutes {
                _ if never_expires => Some(None),
                Some(minutes) => Some(Some(expiry_in(minutes)?)),
                None => None,
            };
            let patch = SharePatch {
                original_filename: filename,
                expires_at,
                password: if remove_password { Some(None) } else { password.map(Some) },
                created_by: None,
            };
            if patch.is_empty() {
                bail!("nothing to update");
            }
            match registry.update(&id, patch).await? {
                Some(record) => println!("{}", format_share(&record)),
                None => bail!("share {} not found", id),
            }
        }
        ShareCommand::Delete { id } => {
            if !registry.delete(&id).await? {
                bail!("share {} not found", id);
            }
            println!("deleted {}", id);
        }
        ShareCommand::Open { id, password } => {
            let record = registry.resolve(&id, password.as_deref()).await?;
            println!("{}", format_share(&record));
        }
    }

    Ok(())
}

async fn execute_files(config: &Config, command: FilesCommand) -> anyhow::Result<()> {
    let api = HttpFileStorage::new(&config.api_base_url, config.request_timeout())?;
    let catalog = FileCatalog::new(api)
        .with_retry(config.retry_config())
        .with_projection_cache(config.projection_cache_size);

    match command {
        FilesCommand::List {
            query,
            categories,
            extensions,
            sort,
            asc,
        } => {
            catalog.refresh().await?;

            let mut view = ViewState::new();
            view.set_query(query);
            for category in categories {
                if !view.is_category_selected(category) {
                    view.toggle_category(category);
                }
            }
            for extension in &extensions {
                view.select_extension(extension);
            }
            let direction = if asc { SortDirection::Asc } else { SortDirection::Desc };
            view.set_sort(sort, direction);

            let shown = catalog.projected(&view).await;
            for file in shown.iter() {
                println!(
                    "{}\t{}\t{}",
                    file.name,
                    file.mime_type,
                    file.uploaded_at.as_deref().unwrap_or("-")
                );
            }
            println!("{} of {} files", shown.len(), catalog.len().await);
        }
        FilesCommand::Upload { paths } => {
            let mut batch = Vec::with_capacity(paths.len());
            for path in &paths {
                let candidate = UploadCandidate::from_path(path)
                    .await
                    .with_context(|| format!("reading {}", path.display()))?;
                batch.push(candidate);
            }

            let report = catalog.upload(batch).await;
            for name in &report.rejected {
                eprintln!("rejected {}: unsupported file type", name);
            }
            for (name, err) in &report.failed {
                eprintln!("failed {}: {}", name, err);
            }
            let uploaded = report
                .accepted
                .iter()
                .filter(|name| !report.failed.iter().any(|(failed, _)| failed == *name))
                .count();
            println!("uploaded {} file(s)", uploaded);
            if uploaded == 0 && report.rejected.is_empty() {
                bail!("no files were uploaded");
            }
        }
        FilesCommand::Delete { name } => {
            catalog.refresh().await?;
            if !catalog.delete(&name).await? {
                bail!("file {} not found", name);
            }
            println!("deleted {}", name);
        }
        FilesCommand::Edit {
            name,
            rename,
            content_file,
        } => {
            catalog.refresh().await?;
            let current = catalog
                .files()
                .await
                .into_iter()
                .find(|f| f.name == name)
                .with_context(|| format!("file {} not found", name))?;

            let new_name = rename.unwrap_or_else(|| current.name.clone());
            let new_content = match content_file {
                Some(path) => tokio::fs::read_to_string(&path)
                    .await
                    .with_context(|| format!("reading {}", path.display()))?,
                None => current.content.clone(),
            };

            let updated = catalog.edit(&name, &new_name, &new_content).await?;
            println!("updated {} -> {}", name, updated.name);
        }
    }

    Ok(())
}

/// Expiry `minutes` from now, refusing offsets chrono cannot represent.
fn expiry_in(minutes: i64) -> anyhow::Result<DateTime<Utc>> {
    TimeDelta::try_minutes(minutes)
        .and_then(|offset| Utc::now().checked_add_signed(offset))
        .with_context(|| format!("expiry of {} minutes is out of range", minutes))
}

fn format_share(record: &SharedFile) -> String {
    let expires = record
        .expires_at
        .map(|at| at.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_else(|| "never".to_string());

    let mut line = format!(
        "{}\t{}\t{}\taccesses={}\texpires={}",
        record.id,
        record.original_filename,
        record.share_url(),
        record.access_count,
        expires
    );
    if record.is_expired() {
        line.push_str("\t[expired]");
    }
    if record.is_password_protected {
        line.push_str("\t[password]");
    }
    line
}
