use std::path::PathBuf;

use clap::{Parser, Subcommand};
use postline::{AppError, Platform, UploadArgs};

#[derive(Parser)]
#[command(name = "postline")]
#[command(version)]
#[command(
    about = "Plan, render, and publish AI-persona content calendars",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a starter profile under resources/
    #[clap(visible_alias = "i")]
    Init {
        /// Profile name, snake_case like 'laura_vigne'
        name: String,
    },
    /// Run the prompt chain and write the week calendar
    Plan {
        /// Profile name (interactive selection when omitted)
        profile: Option<String>,
        /// Target platform: meta or fanvue (both when omitted)
        #[arg(short, long)]
        platform: Option<Platform>,
        /// Ignore the previous storyline and start over
        #[arg(long)]
        fresh: bool,
    },
    /// Render day folders and images from the calendar
    #[clap(visible_alias = "g")]
    Generate {
        profile: Option<String>,
        #[arg(short, long)]
        platform: Option<Platform>,
    },
    /// Publish every due day folder
    Publish {
        profile: Option<String>,
        #[arg(short, long)]
        platform: Option<Platform>,
        /// List what would go out without posting
        #[arg(long)]
        dry_run: bool,
    },
    /// Plan, generate, and publish in one pass
    Run {
        profile: Option<String>,
        #[arg(short, long)]
        platform: Option<Platform>,
        #[arg(long)]
        dry_run: bool,
    },
    /// YouTube channel operations
    #[command(subcommand)]
    Youtube(YoutubeCommands),
    /// Check credentials, profiles, and local services
    Doctor {
        /// Also probe the ComfyUI server
        #[arg(long)]
        comfy: bool,
    },
}

#[derive(Subcommand)]
enum YoutubeCommands {
    /// Upload a video, refusing duplicate titles
    Upload {
        /// Path to the video file
        video: PathBuf,
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        /// Comma-separated tags
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,
        #[arg(long, default_value = "People & Blogs")]
        category: String,
        /// public, unlisted, or private
        #[arg(long, default_value = "public")]
        privacy: String,
    },
}

fn main() {
    let cli = Cli::parse();

    let result: Result<(), AppError> = match cli.command {
        Commands::Init { name } => postline::init(&name),
        Commands::Plan { profile, platform, fresh } => {
            postline::plan(profile.as_deref(), platform, fresh)
        }
        Commands::Generate { profile, platform } => {
            postline::generate(profile.as_deref(), platform)
        }
        Commands::Publish { profile, platform, dry_run } => {
            postline::publish(profile.as_deref(), platform, dry_run)
        }
        Commands::Run { profile, platform, dry_run } => {
            postline::run(profile.as_deref(), platform, dry_run)
        }
        Commands::Youtube(YoutubeCommands::Upload {
            video,
            title,
            description,
            tags,
            category,
            privacy,
        }) => postline::youtube_upload(&UploadArgs {
            video: &video,
            title: &title,
            description: &description,
            tags,
            category: &category,
            privacy: &privacy,
        }),
        Commands::Doctor { comfy } => match postline::doctor(comfy) {
            Ok(report) if !report.is_healthy() => std::process::exit(1),
            other => other.map(|_| ()),
        },
    };

    if let Err(err) = result {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}
