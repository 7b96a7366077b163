//! End-to-end scenarios of the Fortune Cookie dApp: deploy a collection,
//! mint into it, and hand the bodies to a wallet as base64 BoC.

use std::sync::Arc;

use cookie_cell::{BagOfCells, Cell, CellBuilder, CellSlice, Dictionary, MsgAddress};
use cookie_nft::collection::{BATCH_KEY_BITS, OP_BATCH_MINT, OP_MINT};
use cookie_nft::methods::{GetMethod, GetNftAddressByIndex};
use cookie_nft::stack::build_stack;
use cookie_nft::{
    BatchMintEntry, CollectionConfig, CollectionMessage, CookieCollection, CookieItem, FeeConfig,
    MintItemInput, NftError, RoyaltyParams, StackValue, decode_off_chain_uri,
    encode_off_chain_content,
};

fn owner() -> MsgAddress {
    MsgAddress::Internal {
        workchain: 0,
        address: [0x5a; 32],
    }
}

fn code(tag: u32) -> Cell {
    let mut builder = CellBuilder::new();
    builder.store_u32(tag).unwrap();
    builder.build().unwrap()
}

#[test]
fn a_json_is_one_seven_byte_cell() {
    let cell = encode_off_chain_content(b"A.json").unwrap();
    assert_eq!(cell.bit_len(), 7 * 8);
    assert_eq!(cell.data()[0], 0x01);
    assert_eq!(&cell.data()[1..], b"A.json");
    assert_eq!(cell.reference_count(), 0);
    assert_eq!(decode_off_chain_uri(&cell).unwrap(), "A.json");
}

#[test]
fn mint_b_json_survives_boc() {
    let item = MintItemInput::new(5, owner(), 0, 100, "b.json");
    let body = CookieCollection::create_mint_body(124, &item, &FeeConfig::default()).unwrap();

    let b64 = BagOfCells::from_root(body.clone()).serialize_to_base64().unwrap();
    let root = BagOfCells::deserialize_from_base64(&b64)
        .unwrap()
        .into_single_root()
        .unwrap();
    assert_eq!(root.hash(), body.hash());

    let mut slice = CellSlice::new(&root);
    assert_eq!(slice.load_u32().unwrap(), OP_MINT);
    assert_eq!(slice.load_u64().unwrap(), 124);

    assert_eq!(
        CollectionMessage::parse(&root).unwrap(),
        CollectionMessage::Mint {
            query_id: 124,
            item: item.with_pass_amount(50_000_000),
        }
    );
}

#[test]
fn batch_of_250_has_250_keys() {
    let items: Vec<MintItemInput> = (0..250u64)
        .map(|i| MintItemInput::new(i * 3 + 1, owner(), 0, 100, format!("{}.json", i)))
        .collect();
    let body = CookieCollection::create_batch_mint_body(0, &items, &FeeConfig::default()).unwrap();

    let mut slice = CellSlice::new(&body);
    assert_eq!(slice.load_u32().unwrap(), OP_BATCH_MINT);
    assert_eq!(slice.load_u64().unwrap(), 0);
    let dict = Dictionary::<BatchMintEntry>::load(&mut slice, BATCH_KEY_BITS).unwrap();

    assert_eq!(dict.len(), 250);
    let keys: Vec<u64> = dict.iter().map(|(k, _)| k).collect();
    let expected: Vec<u64> = items.iter().map(|i| i.index).collect();
    assert_eq!(keys, expected);
    assert!(dict.iter().all(|(_, entry)| entry.amount == 50_000_000));

    match CollectionMessage::parse(&body).unwrap() {
        CollectionMessage::BatchMint { items: parsed, .. } => {
            assert_eq!(parsed.len(), 250);
            assert_eq!(parsed[10].content, "10.json");
        }
        other => panic!("unexpected message: {:?}", other),
    }

    // Survives a BoC round trip with shared subtrees deduplicated.
    let bytes = BagOfCells::from_root(body.clone()).serialize().unwrap();
    let root = BagOfCells::deserialize(&bytes).unwrap().into_single_root().unwrap();
    assert_eq!(root.hash(), body.hash());
}

#[test]
fn batch_indices_across_top_bit() {
    let high = 1u64 << 63;
    let items = vec![
        MintItemInput::new(1, owner(), 0, 100, "low.json"),
        MintItemInput::new(high, owner(), 0, 100, "high.json"),
    ];
    let body = CookieCollection::create_batch_mint_body(9, &items, &FeeConfig::default()).unwrap();

    let bytes = BagOfCells::from_root(body.clone()).serialize().unwrap();
    let root = BagOfCells::deserialize(&bytes).unwrap().into_single_root().unwrap();
    assert_eq!(root.hash(), body.hash());

    match CollectionMessage::parse(&root).unwrap() {
        CollectionMessage::BatchMint { query_id, items: parsed } => {
            assert_eq!(query_id, 9);
            let indices: Vec<u64> = parsed.iter().map(|i| i.index).collect();
            assert_eq!(indices, vec![1, high]);
            assert_eq!(parsed[1].content, "high.json");
        }
        other => panic!("unexpected message: {:?}", other),
    }
}

#[test]
fn batch_of_251_is_rejected() {
    let items: Vec<MintItemInput> = (0..251u64)
        .map(|i| MintItemInput::new(i, owner(), 0, 100, "x.json"))
        .collect();
    let err = CookieCollection::create_batch_mint_body(0, &items, &FeeConfig::default()).unwrap_err();
    assert!(matches!(err, NftError::BatchTooLarge { max: 250, got: 251 }));
}

#[test]
fn snake_chunk_count() {
    for len in [0usize, 1, 125, 126, 127, 253, 254, 1000] {
        let content = vec![b'q'; len];
        let cell = encode_off_chain_content(&content).unwrap();
        let mut current: &Cell = &cell;
        let mut count = 1;
        while let Some(next) = current.reference(0) {
            current = &**next;
            count += 1;
        }
        assert_eq!(count, (len + 1).div_ceil(127), "content length {}", len);
    }
}

#[test]
fn deploy_collection_and_locate_items() {
    let config = CollectionConfig {
        owner: owner(),
        next_item_index: 0,
        collection_content: "https://cookies.example/collectionCover.json".to_string(),
        common_content: "https://cookies.example/".to_string(),
        item_code: Arc::new(code(2)),
        royalty: RoyaltyParams::new(5, 10, owner()),
    };
    let collection = CookieCollection::from_config(&config, code(1), 0).unwrap();
    let state_init = collection.state_init().unwrap();
    assert_eq!(
        CollectionConfig::from_data_cell(&state_init.data).unwrap(),
        config
    );

    // The collection answers get_nft_address_by_index with the derived item address.
    let item = CookieItem::from_config(7, collection.address(), config.item_code.clone(), 0).unwrap();
    let call = GetNftAddressByIndex { index: 7 };
    assert_eq!(call.params().unwrap(), vec![StackValue::Int(7)]);

    let response = build_stack(&[StackValue::address(item.address()).unwrap()]).unwrap();
    let bytes = BagOfCells::from_root(response).serialize().unwrap();
    assert_eq!(
        GetNftAddressByIndex::decode_result(0, &bytes).unwrap(),
        *item.address()
    );
}
