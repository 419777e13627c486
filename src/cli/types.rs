//! CLI type definitions
//!
//! This module contains clap command structures that define the CLI interface.

use clap::{Parser, Subcommand};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "pricemon")]
#[command(about = "Price-monitoring scheduler, dispatcher, and notification platform", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the local database and config directory
    Init {
        /// Force reinitialization even if already initialized
        #[arg(short, long)]
        force: bool,
    },

    /// Scheduler commands (admits due tasks into the dispatch queue)
    #[command(subcommand)]
    Schedule(ScheduleCommands),

    /// Dispatcher commands (runs admitted tasks through the worker pool)
    #[command(subcommand)]
    Dispatch(DispatchCommands),

    /// Run the scheduler, dispatcher, and notification sweep on their
    /// configured cadences until interrupted
    Serve,

    /// Product and monitoring-policy commands
    #[command(subcommand)]
    Product(ProductCommands),

    /// Alert rule commands
    #[command(subcommand)]
    Rule(RuleCommands),

    /// Read aggregated monitoring statistics
    Stats,
}

#[derive(Subcommand)]
pub enum ScheduleCommands {
    /// Run a single scheduling cycle now, instead of waiting for the next
    /// tick of `serve`
    RunOnce,
}

#[derive(Subcommand)]
pub enum DispatchCommands {
    /// Run a single dispatch cycle now, instead of waiting for the next
    /// tick of `serve`
    RunOnce,
}

#[derive(Subcommand)]
pub enum ProductCommands {
    /// Register a product URL and create its monitoring policy
    AddConfig {
        /// Full product page URL
        url: String,

        /// Retailer identifier (used for throttling, e.g. "amazon")
        retailer: String,

        /// ISO 4217 currency code
        #[arg(long, default_value = "EUR")]
        currency: String,
    },

    /// Schedule an out-of-band check for a product right away
    ForceImmediate {
        /// Product id
        product_id: Uuid,
    },

    /// Set a product's manual priority boost (0-10; higher checks sooner)
    SetBoost {
        /// Product id
        product_id: Uuid,

        /// Boost value in [0, 10]
        boost: String,
    },
}

#[derive(Subcommand)]
pub enum RuleCommands {
    /// Add a single-condition alert rule for a user
    Add {
        /// Owning user id
        user_id: Uuid,

        /// Restrict the rule to one product (otherwise it is global)
        #[arg(long)]
        product_id: Option<Uuid>,

        /// Event type the rule reacts to
        #[arg(long, value_enum)]
        event: EventTypeArg,

        /// Event field to compare (e.g. "priceChangePercentage")
        #[arg(long)]
        field: String,

        /// Comparison operator
        #[arg(long, value_enum)]
        op: OperatorArg,

        /// Literal value compared against; parsed as a decimal unless
        /// `--bool` or `--text` is passed
        value: String,

        #[arg(long, conflicts_with = "text")]
        bool_value: bool,

        #[arg(long, conflicts_with = "bool_value")]
        text: bool,

        /// Base priority in [0, 9]
        #[arg(long, default_value_t = 5)]
        priority: u8,

        /// Aggregation cadence
        #[arg(long, value_enum, default_value = "immediate")]
        batch: BatchTypeArg,
    },

    /// List a user's alert rules
    List {
        /// Owning user id
        user_id: Uuid,
    },
}

#[derive(Clone, Copy, clap::ValueEnum)]
pub enum EventTypeArg {
    PriceDropped,
    PriceIncreased,
    AvailabilityChanged,
    PricePredictionMade,
}

#[derive(Clone, Copy, clap::ValueEnum)]
pub enum OperatorArg {
    Eq,
    Gt,
    Lt,
    Gte,
    Lte,
}

#[derive(Clone, Copy, clap::ValueEnum)]
pub enum BatchTypeArg {
    Immediate,
    Hourly,
    Daily,
}
