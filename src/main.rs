use std::sync::Arc;

use clap::{Parser, Subcommand};
use coursemail::{
    coursemail_version,
    modules::{
        context::MailContext,
        database::manager::DatabaseManager,
        directory::StaticDirectory,
        error::{internal, CourseMailResult},
        logger,
        privacy::{contexts_for_user, delete_course_data, delete_user_data, export_user_data},
        settings::cli::Settings,
    },
};
use mimalloc::MiMalloc;
use serde::Serialize;
use tracing::{error, info};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[derive(Debug, Parser)]
#[command(name = "coursemail", version = coursemail_version!())]
struct Cli {
    #[command(flatten)]
    settings: Settings,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Remove every message of a course with its attachments
    PurgeCourse {
        #[arg(long)]
        course_id: u64,
    },
    /// Honor a data deletion request; every course of the user when none is given
    DeleteUserData {
        #[arg(long)]
        user_id: u64,
        #[arg(long, value_delimiter = ',')]
        course_ids: Vec<u64>,
    },
    /// Print the mail data of a user as JSON
    ExportUserData {
        #[arg(long)]
        user_id: u64,
    },
}

#[tokio::main]
async fn main() -> CourseMailResult<()> {
    let cli = Cli::parse();
    logger::initialize_logging(&cli.settings);
    info!("Version:  {}", coursemail_version!());
    info!("Git:      [{}]", env!("GIT_HASH"));

    if let Err(error) = run(cli).await {
        error!("{}", error);
        eprintln!("{:?}", error);
        return Err(error);
    }
    Ok(())
}

async fn run(cli: Cli) -> CourseMailResult<()> {
    let db = DatabaseManager::open(&cli.settings)?;
    let ctx = MailContext::new(db, Arc::new(StaticDirectory::new()), &cli.settings);

    match cli.command {
        Command::PurgeCourse { course_id } => {
            print_json(&delete_course_data(&ctx, course_id).await?)
        }
        Command::DeleteUserData {
            user_id,
            course_ids,
        } => {
            let course_ids = if course_ids.is_empty() {
                contexts_for_user(&ctx, user_id).await?
            } else {
                course_ids
            };
            print_json(&delete_user_data(&ctx, user_id, &course_ids).await?)
        }
        Command::ExportUserData { user_id } => print_json(&export_user_data(&ctx, user_id).await?),
    }
}

fn print_json<T: Serialize>(value: &T) -> CourseMailResult<()> {
    let json = serde_json::to_string_pretty(value).map_err(internal)?;
    println!("{}", json);
    Ok(())
}
