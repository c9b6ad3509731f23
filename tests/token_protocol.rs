//! End-to-end decoding of token protocol transactions

mod common;

use common::*;
use token_tape_decoder::decode::decode_transaction;
use token_tape_decoder::token::identify::FT_UNLOCK_SCRIPT_MIN_LEN;
use token_tape_decoder::token::{FT_TAPE_MARKER, NFT_MINT_FLAG};
use token_tape_decoder::types::{
    Network, ProtocolGeneration, Recipient, ScriptShape, TransactionType,
};

const RECIPIENT_HASH: [u8; 20] = [0x42; 20];

#[tokio::test]
async fn mint_transaction_decodes_tape_record() {
    let funding = build_tx(vec![coinbase_input()], vec![txout(5_000_000, &p2pkh_script())]);
    let mint = build_tx(
        vec![spending_input(&funding, 0, 107)],
        vec![
            txout(500, &code_script(&RECIPIENT_HASH, 0x00)),
            txout(
                0,
                &tape_script(1_000_000_000_000, 6, "Test Token", "TT", FT_TAPE_MARKER),
            ),
            txout(4_000_000, &p2pkh_script()),
        ],
    );
    let source = StubSource::new().with(&funding);

    let detail = decode_transaction(
        &raw_hex(&mint),
        Network::Mainnet,
        ProtocolGeneration::Ft,
        &source,
    )
    .await
    .unwrap();

    let token = detail.token.expect("token summary");
    assert_eq!(token.tx_type, TransactionType::FtMint);
    let record = token.mint.expect("mint record");
    assert_eq!(record.name, "Test Token");
    assert_eq!(record.symbol, "TT");
    assert_eq!(record.decimal, 6);
    assert_eq!(record.raw_supply, 1_000_000_000_000);
    assert_eq!(record.amount, 1_000_000.0);

    // The tape output carries the record inline too
    assert_eq!(detail.outputs[1].tape.as_ref(), Some(&record));
    // The funding input resolved
    assert_eq!(detail.inputs[0].value, Some(5.0));
}

#[tokio::test]
async fn transfer_transaction_decodes_recipient_and_amount() {
    let funding = build_tx(vec![coinbase_input()], vec![txout(5_000_000, &p2pkh_script())]);
    // A token-sized unlocking script marks this as a spend, not a self-mint
    let transfer = build_tx(
        vec![spending_input(&funding, 0, FT_UNLOCK_SCRIPT_MIN_LEN + 50)],
        vec![
            txout(500, &code_script(&RECIPIENT_HASH, 0x00)),
            txout(0, &tape_script(1_500_000, 6, "Test Token", "TT", FT_TAPE_MARKER)),
        ],
    );
    let source = StubSource::new().with(&funding);

    let detail = decode_transaction(
        &raw_hex(&transfer),
        Network::Mainnet,
        ProtocolGeneration::Ft,
        &source,
    )
    .await
    .unwrap();

    let token = detail.token.expect("token summary");
    assert_eq!(token.tx_type, TransactionType::FtTransfer);
    let record = token.transfer.expect("transfer record");
    assert_eq!(record.amount, 1.5);
    assert_eq!(record.decimal, 6);
    match record.recipient {
        Recipient::Address(addr) => {
            let (hash, _) = token_tape_decoder::address::address_to_hash(&addr).unwrap();
            assert_eq!(hash, RECIPIENT_HASH);
        }
        other => panic!("expected address recipient, got {:?}", other),
    }
}

#[tokio::test]
async fn opaque_recipient_hash_is_passed_through() {
    let funding = build_tx(vec![coinbase_input()], vec![txout(5_000_000, &p2pkh_script())]);
    let transfer = build_tx(
        vec![spending_input(&funding, 0, FT_UNLOCK_SCRIPT_MIN_LEN + 50)],
        vec![
            txout(500, &code_script(&RECIPIENT_HASH, 0x01)),
            txout(0, &tape_script(2_000_000, 6, "Test Token", "TT", FT_TAPE_MARKER)),
        ],
    );
    let source = StubSource::new().with(&funding);

    let detail = decode_transaction(
        &raw_hex(&transfer),
        Network::Mainnet,
        ProtocolGeneration::Ft,
        &source,
    )
    .await
    .unwrap();

    let record = detail.token.unwrap().transfer.unwrap();
    assert_eq!(record.recipient, Recipient::Hash(hex::encode(RECIPIENT_HASH)));
}

#[tokio::test]
async fn nft_create_flag_recognised_in_ftnft_generation() {
    let funding = build_tx(vec![coinbase_input()], vec![txout(5_000_000, &p2pkh_script())]);
    let create = build_tx(
        vec![spending_input(&funding, 0, 107)],
        vec![
            txout(0, &flag_script(NFT_MINT_FLAG)),
            txout(4_000_000, &p2pkh_script()),
        ],
    );
    let source = StubSource::new().with(&funding);

    let detail = decode_transaction(
        &raw_hex(&create),
        Network::Mainnet,
        ProtocolGeneration::FtNft,
        &source,
    )
    .await
    .unwrap();

    let token = detail.token.expect("token summary");
    assert_eq!(token.tx_type, TransactionType::NftCreate);
    // No tape output in this transaction: the placeholder stands in
    let record = token.mint.expect("placeholder record");
    assert_eq!(record.name, "Unknown");

    // The same transaction under the FT-only generation is not an NFT type
    let detail = decode_transaction(
        &raw_hex(&create),
        Network::Mainnet,
        ProtocolGeneration::Ft,
        &source,
    )
    .await
    .unwrap();
    assert!(detail.token.is_none());
}

#[tokio::test]
async fn plain_payment_carries_no_token_summary() {
    let funding = build_tx(vec![coinbase_input()], vec![txout(5_000_000, &p2pkh_script())]);
    let payment = build_tx(
        vec![spending_input(&funding, 0, 107)],
        vec![txout(4_900_000, &p2pkh_script())],
    );
    let source = StubSource::new().with(&funding);

    let detail = decode_transaction(
        &raw_hex(&payment),
        Network::Mainnet,
        ProtocolGeneration::Ft,
        &source,
    )
    .await
    .unwrap();

    assert!(detail.token.is_none());
    assert!(matches!(
        detail.outputs[0].script.shape,
        ScriptShape::PubKeyHash { .. }
    ));
    assert!(detail.outputs[0].script.address.is_some());
}
