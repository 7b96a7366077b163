use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "cookie",
    about = "Build Fortune Cookie NFT messages as base64 BoC for a wallet to sign",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable debug logging on stderr
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Path to config file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Collection address (overrides the config file)
    #[arg(long, global = true)]
    pub collection: Option<String>,

    /// Query id stored in the message header
    #[arg(long, global = true, default_value_t = 0)]
    pub query_id: u64,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Mint one item
    Mint {
        #[command(flatten)]
        item: ItemArgs,

        /// Amount forwarded to the new item, in nanotons
        #[arg(long)]
        pass_amount: Option<u128>,
    },

    /// Mint up to 250 items listed in a TOML file ([[items]] tables)
    BatchMint {
        /// File with the items to mint
        file: PathBuf,
    },

    /// Hand the collection over to a new owner
    ChangeOwner {
        /// New owner address
        new_owner: String,
    },

    /// Replace collection content and royalty parameters
    EditContent {
        /// Collection metadata URI
        #[arg(long)]
        collection_content: String,

        /// Prefix of every item's content
        #[arg(long)]
        common_content: String,

        #[command(flatten)]
        royalty: RoyaltyArgs,
    },

    /// Ask the collection to report its royalty parameters
    GetRoyaltyParams,

    /// Transfer an item to a new owner
    Transfer {
        /// New owner address
        new_owner: String,

        /// Address receiving the excess, none when omitted
        #[arg(long)]
        response_to: Option<String>,

        /// Amount forwarded with the ownership notification, in nanotons
        #[arg(long, default_value_t = 0)]
        forward_amount: u128,

        /// Forward payload as base64 BoC, stored inline
        #[arg(long)]
        forward_payload: Option<String>,
    },

    /// Reveal an item's lucky value
    Unseal,

    /// Ask an item to report its index and collection
    GetStaticData,

    /// Derive a collection's address and state init
    DeployCollection {
        /// Owner address
        #[arg(long)]
        owner: String,

        /// Collection metadata URI
        #[arg(long)]
        collection_content: String,

        /// Prefix of every item's content
        #[arg(long)]
        common_content: String,

        /// Collection code as base64 BoC
        #[arg(long)]
        code: String,

        /// Item code as base64 BoC
        #[arg(long)]
        item_code: String,

        #[command(flatten)]
        royalty: RoyaltyArgs,

        /// Amount attached to the deploy message, in nanotons
        #[arg(long)]
        value: u128,
    },

    /// Derive the address of an item of the collection
    ItemAddress {
        /// Item index
        index: u64,

        /// Item code as base64 BoC
        #[arg(long)]
        item_code: String,
    },

    /// Encode or decode off-chain content
    Content {
        #[command(subcommand)]
        action: ContentAction,
    },

    /// Decode a collection message body given as base64 BoC
    DecodeBody {
        boc: String,
    },

    /// Decode a get method result stack given as base64 BoC
    DecodeResult {
        #[arg(value_enum)]
        method: Method,

        boc: String,

        /// Exit code reported with the result
        #[arg(long, default_value_t = 0)]
        exit_code: i32,
    },
}

#[derive(Args)]
pub struct ItemArgs {
    /// Item index
    #[arg(long)]
    pub index: u64,

    /// Owner address
    #[arg(long)]
    pub owner: String,

    /// Lower bound of the lucky value
    #[arg(long, default_value_t = 0)]
    pub lower_bound: u32,

    /// Upper bound of the lucky value
    #[arg(long, default_value_t = 100)]
    pub upper_bound: u32,

    /// Item content, relative to the common content
    #[arg(long)]
    pub content: String,
}

#[derive(Args)]
pub struct RoyaltyArgs {
    #[arg(long)]
    pub royalty_factor: u16,

    #[arg(long)]
    pub royalty_base: u16,

    /// Address receiving royalties
    #[arg(long)]
    pub royalty_address: String,
}

#[derive(Subcommand)]
pub enum ContentAction {
    /// Encode a URI as off-chain content
    Encode { uri: String },
    /// Decode off-chain content given as base64 BoC
    Decode { boc: String },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum Method {
    GetCollectionData,
    GetNftAddressByIndex,
    RoyaltyParams,
    GetNftContent,
    GetNftData,
    GetLuckyValue,
}
