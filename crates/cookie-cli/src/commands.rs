use std::path::Path;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use cookie_cell::{BagOfCells, Cell, MsgAddress};
use cookie_nft::methods::{
    GetCollectionData, GetLuckyValue, GetMethod, GetNftAddressByIndex, GetNftContent, GetNftData,
    GetRoyaltyParams,
};
use cookie_nft::{
    CollectionConfig, CollectionMessage, CookieCollection, CookieItem, MintItemInput,
    RoyaltyParams, decode_off_chain_uri, encode_off_chain_content,
};
use serde::Deserialize;
use tracing::debug;

use crate::cli::{Commands, ContentAction, ItemArgs, Method, RoyaltyArgs};
use crate::config::Config;
use crate::error::{CliError, CliResult};

/// A message ready to be signed by a wallet.
pub struct Outgoing {
    pub to: Option<MsgAddress>,
    /// Attached value in nanotons.
    pub value: u128,
    pub body: Cell,
    pub state_init: Option<Cell>,
}

/// What a command prints.
pub enum Output {
    Message(Outgoing),
    Text(Vec<(&'static str, String)>),
}

/// `[[items]]` tables of a batch mint file.
#[derive(Debug, Deserialize)]
struct BatchFile {
    items: Vec<BatchItem>,
}

#[derive(Debug, Deserialize)]
struct BatchItem {
    index: u64,
    owner: String,
    #[serde(default)]
    lower_bound: u32,
    #[serde(default = "default_upper_bound")]
    upper_bound: u32,
    content: String,
}

fn default_upper_bound() -> u32 {
    100
}

pub fn run(
    command: Commands,
    config: &Config,
    collection: Option<&str>,
    query_id: u64,
) -> CliResult<Output> {
    let fees = &config.fees;
    let collection = config.collection_address(collection)?;

    match command {
        Commands::Mint { item, pass_amount } => {
            let mut item = mint_item(&item)?;
            item.pass_amount = pass_amount;
            Ok(Output::Message(Outgoing {
                to: collection,
                value: fees.mint_value(item.pass_amount),
                body: CookieCollection::create_mint_body(query_id, &item, fees)?,
                state_init: None,
            }))
        }

        Commands::BatchMint { file } => {
            let items = load_batch(&file)?;
            debug!("Loaded {} items from {}", items.len(), file.display());
            Ok(Output::Message(Outgoing {
                to: collection,
                value: fees.batch_mint_value(items.len()),
                body: CookieCollection::create_batch_mint_body(query_id, &items, fees)?,
                state_init: None,
            }))
        }

        Commands::ChangeOwner { new_owner } => Ok(Output::Message(Outgoing {
            to: collection,
            value: fees.admin_value as u128,
            body: CookieCollection::create_change_owner_body(query_id, &parse_address(&new_owner)?)?,
            state_init: None,
        })),

        Commands::EditContent {
            collection_content,
            common_content,
            royalty,
        } => Ok(Output::Message(Outgoing {
            to: collection,
            value: fees.admin_value as u128,
            body: CookieCollection::create_edit_content_body(
                query_id,
                &collection_content,
                &common_content,
                &royalty_params(&royalty)?,
            )?,
            state_init: None,
        })),

        Commands::GetRoyaltyParams => Ok(Output::Message(Outgoing {
            to: collection,
            value: fees.admin_value as u128,
            body: CookieCollection::create_get_royalty_params_body(query_id)?,
            state_init: None,
        })),

        Commands::Transfer {
            new_owner,
            response_to,
            forward_amount,
            forward_payload,
        } => {
            let response_to = match response_to {
                Some(s) => parse_address(&s)?,
                None => MsgAddress::Null,
            };
            let payload = forward_payload.as_deref().map(parse_boc).transpose()?;
            Ok(Output::Message(Outgoing {
                to: None,
                value: fees.admin_value as u128,
                body: CookieItem::create_transfer_body(
                    query_id,
                    &parse_address(&new_owner)?,
                    &response_to,
                    forward_amount,
                    payload.as_deref(),
                )?,
                state_init: None,
            }))
        }

        Commands::Unseal => Ok(Output::Message(Outgoing {
            to: None,
            value: fees.admin_value as u128,
            body: CookieItem::create_unseal_body(query_id)?,
            state_init: None,
        })),

        Commands::GetStaticData => Ok(Output::Message(Outgoing {
            to: None,
            value: fees.static_data_value as u128,
            body: CookieItem::create_get_static_data_body(query_id)?,
            state_init: None,
        })),

        Commands::DeployCollection {
            owner,
            collection_content,
            common_content,
            code,
            item_code,
            royalty,
            value,
        } => {
            let collection_config = CollectionConfig {
                owner: parse_address(&owner)?,
                next_item_index: 0,
                collection_content,
                common_content,
                item_code: parse_boc(&item_code)?,
                royalty: royalty_params(&royalty)?,
            };
            let deployed =
                CookieCollection::from_config(&collection_config, parse_boc(&code)?, config.workchain)?;
            let state_init = deployed
                .state_init()
                .ok_or_else(|| CliError::Input("collection has no state init".to_string()))?
                .to_cell()?;
            Ok(Output::Message(Outgoing {
                to: Some(*deployed.address()),
                value,
                body: Cell::empty(),
                state_init: Some(state_init),
            }))
        }

        Commands::ItemAddress { index, item_code } => {
            let collection = collection.ok_or_else(|| {
                CliError::Usage("item-address needs --collection or a configured collection".to_string())
            })?;
            let item = CookieItem::from_config(index, &collection, parse_boc(&item_code)?, config.workchain)?;
            Ok(Output::Text(vec![
                ("index", index.to_string()),
                ("address", format_address(item.address())),
                ("raw", item.address().to_raw_string()),
            ]))
        }

        Commands::Content { action } => match action {
            ContentAction::Encode { uri } => {
                let cell = encode_off_chain_content(uri.as_bytes())?;
                Ok(Output::Text(vec![("boc", to_base64(cell)?)]))
            }
            ContentAction::Decode { boc } => {
                let uri = decode_off_chain_uri(&*parse_boc(&boc)?)?;
                Ok(Output::Text(vec![("uri", uri)]))
            }
        },

        Commands::DecodeBody { boc } => {
            let message = CollectionMessage::parse(&*parse_boc(&boc)?)?;
            Ok(Output::Text(vec![
                ("op", format!("0x{:08x}", message.opcode())),
                ("query_id", message.query_id().to_string()),
                ("message", format!("{:?}", message)),
            ]))
        }

        Commands::DecodeResult {
            method,
            boc,
            exit_code,
        } => {
            let bytes = STANDARD
                .decode(boc.trim())
                .map_err(|e| CliError::Input(format!("invalid base64: {}", e)))?;
            let decoded = match method {
                Method::GetCollectionData => {
                    format!("{:?}", GetCollectionData::decode_result(exit_code, &bytes)?)
                }
                Method::GetNftAddressByIndex => {
                    format_address(&GetNftAddressByIndex::decode_result(exit_code, &bytes)?)
                }
                Method::RoyaltyParams => {
                    format!("{:?}", GetRoyaltyParams::decode_result(exit_code, &bytes)?)
                }
                Method::GetNftContent => GetNftContent::decode_result(exit_code, &bytes)?,
                Method::GetNftData => format!("{:?}", GetNftData::decode_result(exit_code, &bytes)?),
                Method::GetLuckyValue => GetLuckyValue::decode_result(exit_code, &bytes)?.to_string(),
            };
            Ok(Output::Text(vec![("result", decoded)]))
        }
    }
}

fn mint_item(args: &ItemArgs) -> CliResult<MintItemInput> {
    Ok(MintItemInput::new(
        args.index,
        parse_address(&args.owner)?,
        args.lower_bound,
        args.upper_bound,
        args.content.clone(),
    ))
}

fn load_batch(path: &Path) -> CliResult<Vec<MintItemInput>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| CliError::Input(format!("{}: {}", path.display(), e)))?;
    parse_batch(&content).map_err(|e| match e {
        CliError::Input(msg) => CliError::Input(format!("{}: {}", path.display(), msg)),
        other => other,
    })
}

fn parse_batch(content: &str) -> CliResult<Vec<MintItemInput>> {
    let file: BatchFile = toml::from_str(content).map_err(|e| CliError::Input(e.to_string()))?;
    file.items
        .into_iter()
        .map(|item| {
            Ok(MintItemInput::new(
                item.index,
                parse_address(&item.owner)?,
                item.lower_bound,
                item.upper_bound,
                item.content,
            ))
        })
        .collect()
}

fn royalty_params(args: &RoyaltyArgs) -> CliResult<RoyaltyParams> {
    Ok(RoyaltyParams::new(
        args.royalty_factor,
        args.royalty_base,
        parse_address(&args.royalty_address)?,
    ))
}

fn parse_address(s: &str) -> CliResult<MsgAddress> {
    let address = MsgAddress::from_string(s)?;
    if address.is_null() {
        return Err(CliError::Usage("address must not be empty".to_string()));
    }
    Ok(address)
}

/// Single-root BoC given as base64.
fn parse_boc(s: &str) -> CliResult<Arc<Cell>> {
    Ok(BagOfCells::deserialize_from_base64(s.trim())?.into_single_root()?)
}

pub fn to_base64(cell: Cell) -> CliResult<String> {
    Ok(BagOfCells::from_root(cell).serialize_to_base64()?)
}

/// Bounceable user-friendly form, raw form for `Null`.
pub fn format_address(address: &MsgAddress) -> String {
    address
        .to_user_friendly(true, false)
        .unwrap_or_else(|| address.to_raw_string())
}
