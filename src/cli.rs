use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the web app and its REST API.
    Serve {
        /// Bind address, e.g. 127.0.0.1:8080. Overrides the config file.
        #[clap(short, long)]
        bind: Option<String>,
    },

    /// Semantic search over the collection.
    Search {
        /// The query. Omit it to get an interactive prompt.
        query: Option<String>,

        /// How many results to show
        #[clap(short = 'n', long)]
        num: Option<usize>,

        /// Print the raw JSON response
        #[clap(long, default_value = "false")]
        json: bool,
    },

    /// List channels with aggregate statistics.
    Channels {
        /// count_desc (default), count_asc, alpha or alpha_desc
        #[clap(short, long)]
        sort: Option<String>,

        /// Only channels whose name contains this
        #[clap(short, long)]
        query: Option<String>,

        #[clap(short, long)]
        limit: Option<usize>,

        #[clap(short, long)]
        offset: Option<usize>,

        /// Print the raw JSON response
        #[clap(long, default_value = "false")]
        json: bool,
    },

    /// List every stored video of one channel.
    ChannelVideos {
        channel: String,

        /// Print the raw JSON response
        #[clap(long, default_value = "false")]
        json: bool,
    },

    /// Show the precomputed topic clusters.
    Topics {
        /// Print the raw JSON response
        #[clap(long, default_value = "false")]
        json: bool,
    },
}
