//! CLI entry point for gitpost

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gitpost::commands::{self, publish::PostFields};
use gitpost::listing::PostFilter;

#[derive(Parser)]
#[command(name = "gitpost")]
#[command(version)]
#[command(about = "Write, publish and read a blog stored in a GitHub repository", long_about = None)]
struct Cli {
    /// Set the site directory (defaults to current directory)
    #[arg(short, long, global = true)]
    cwd: Option<PathBuf>,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct PostArgs {
    /// Post title
    #[arg(short, long)]
    title: Option<String>,

    /// Short summary shown in lists
    #[arg(short, long)]
    excerpt: Option<String>,

    /// Markdown file with the post body
    #[arg(short, long)]
    body_file: Option<PathBuf>,

    #[arg(long)]
    category: Option<String>,

    #[arg(long)]
    author: Option<String>,

    /// Cover image URL
    #[arg(long)]
    image: Option<String>,

    /// Add a tag (repeatable)
    #[arg(long = "tag")]
    tags: Vec<String>,

    /// Remove a tag (repeatable)
    #[arg(long = "remove-tag")]
    remove_tags: Vec<String>,
}

impl From<PostArgs> for PostFields {
    fn from(args: PostArgs) -> Self {
        PostFields {
            title: args.title,
            excerpt: args.excerpt,
            body_file: args.body_file,
            category: args.category,
            author: args.author,
            image: args.image,
            tags: args.tags,
            remove_tags: args.remove_tags,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in to the editor with a GitHub personal access token
    Login {
        #[arg(long)]
        token: Option<String>,
    },

    /// Forget the stored token
    Logout,

    /// Show the signed-in account
    Whoami,

    /// Publish a new post
    #[command(alias = "p")]
    Publish(PostArgs),

    /// Update an existing post
    Edit {
        /// Post filename, e.g. 2024-01-15-hello.md
        filename: String,

        #[command(flatten)]
        fields: PostArgs,
    },

    /// Delete a post
    Delete {
        filename: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// List published posts
    #[command(alias = "ls")]
    List {
        /// Search titles and excerpts
        #[arg(short, long)]
        search: Option<String>,

        #[arg(long)]
        category: Option<String>,

        #[arg(long)]
        tag: Option<String>,

        #[arg(short, long, default_value = "1")]
        page: usize,
    },

    /// Show a post and count a view
    Show {
        /// Post ID (filename without .md)
        id: String,

        /// Render the body as HTML
        #[arg(long)]
        html: bool,
    },

    /// List categories and tags
    Taxonomy,

    /// Like a post, or take the like back
    Like { id: String },

    /// Show the like count of a post
    Likes { id: String },

    /// Follow the like count of a post until Ctrl-C
    WatchLikes { id: String },

    /// Read and write comments
    Comment {
        #[command(subcommand)]
        action: CommentAction,
    },

    /// Show view counts
    Views {
        /// Post IDs (all posts when omitted)
        ids: Vec<String>,
    },

    /// Display version information
    Version,
}

#[derive(Subcommand)]
enum CommentAction {
    /// Add a comment
    Add {
        post: String,
        text: String,
        #[arg(long)]
        author: Option<String>,
    },

    /// List comments, newest first
    List { post: String },

    /// Edit one of your comments
    Edit {
        post: String,
        comment: String,
        text: String,
    },

    /// Delete one of your comments
    Delete { post: String, comment: String },

    /// Follow the comments of a post until Ctrl-C
    Watch { post: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.debug {
        "gitpost=debug,info"
    } else {
        "gitpost=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine base directory
    let base_dir = match cli.cwd {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };

    let app = gitpost::GitPost::new(&base_dir)?;

    match cli.command {
        Commands::Login { token } => commands::login::login(&app, token).await?,
        Commands::Logout => commands::login::logout(&app)?,
        Commands::Whoami => commands::login::whoami(&app)?,

        Commands::Publish(args) => {
            commands::publish::publish(&app, &PostFields::from(args)).await?;
        }
        Commands::Edit { filename, fields } => {
            commands::publish::edit(&app, &filename, &PostFields::from(fields)).await?;
        }
        Commands::Delete { filename, yes } => commands::delete::run(&app, &filename, yes).await?,

        Commands::List {
            search,
            category,
            tag,
            page,
        } => {
            let filter = PostFilter {
                search,
                category,
                tag,
            };
            commands::list::run(&app, &filter, page).await?;
        }
        Commands::Show { id, html } => commands::show::run(&app, &id, html).await?,
        Commands::Taxonomy => commands::list::show_taxonomy(&app).await?,

        Commands::Like { id } => commands::engage::like(&app, &id).await?,
        Commands::Likes { id } => commands::engage::likes(&app, &id).await?,
        Commands::WatchLikes { id } => commands::engage::watch_likes(&app, &id).await?,
        Commands::Views { ids } => commands::engage::views(&app, &ids).await?,

        Commands::Comment { action } => match action {
            CommentAction::Add { post, text, author } => {
                commands::engage::comment_add(&app, &post, &text, author.as_deref()).await?
            }
            CommentAction::List { post } => commands::engage::comment_list(&app, &post).await?,
            CommentAction::Edit {
                post,
                comment,
                text,
            } => commands::engage::comment_edit(&app, &post, &comment, &text).await?,
            CommentAction::Delete { post, comment } => {
                commands::engage::comment_delete(&app, &post, &comment).await?
            }
            CommentAction::Watch { post } => commands::engage::comment_watch(&app, &post).await?,
        },

        Commands::Version => {
            println!("gitpost version {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
