//! End-to-end scenarios driven through the node.

use scriptchain_chain::{Node, NodeConfig, NodeError, WalletError};
use scriptchain_consensus::{DifficultyPolicy, MinerConfig, SubsidyPolicy, TransactionError};
use scriptchain_core::{merkle_root, script, OutPoint, TxOutput};
use scriptchain_vm::CheckSigPolicy;

fn config(checksig: CheckSigPolicy) -> NodeConfig {
    NodeConfig {
        miner: MinerConfig {
            difficulty: DifficultyPolicy::Fixed(3),
            subsidy: SubsidyPolicy::Fixed(501),
            seed: Some(42),
            ..MinerConfig::default()
        },
        min_fee: 1,
        max_fee: 1,
        checksig,
        ..NodeConfig::default()
    }
}

/// alice mines the first block, keeps 500 of it, then pays bob 100 with
/// 399 change. A separate miner produces the later blocks.
fn example(checksig: CheckSigPolicy) -> Node {
    let mut node = Node::new(config(checksig));
    for name in ["alice", "bob", "miner"] {
        node.create_wallet(name).unwrap();
    }
    node.add_miner("alice").unwrap();
    node.add_miner("miner").unwrap();

    let genesis = node.mine(Some("alice")).unwrap();
    let reward = OutPoint::new(genesis.block.transactions[0].hash(), 0);
    assert_eq!(node.balance("alice").unwrap(), 501);

    let wallet = node.wallet_mut("alice").unwrap();
    let own = wallet.lock_script();
    wallet.unlock_own(reward).unwrap();
    wallet.stage_output(500, &own).unwrap();
    let first = wallet.build_transaction(1).unwrap();
    let first_hash = node.submit(first).unwrap();
    node.mine(Some("miner")).unwrap();
    assert_eq!(node.balance("alice").unwrap(), 500);

    let bob = node.wallet("bob").unwrap().lock_script();
    let wallet = node.wallet_mut("alice").unwrap();
    let own = wallet.lock_script();
    wallet.unlock_own(OutPoint::new(first_hash, 0)).unwrap();
    wallet.stage_output(100, &bob).unwrap();
    wallet.stage_output(399, &own).unwrap();
    let second = wallet.build_transaction(1).unwrap();
    node.submit(second).unwrap();
    let mined = node.mine(Some("miner")).unwrap();
    assert_eq!(mined.accepted.len(), 1);
    node
}

#[test]
fn test_example_scenario() {
    let node = example(CheckSigPolicy::Stubbed);
    assert_eq!(node.balance("alice").unwrap(), 399);
    assert_eq!(node.balance("bob").unwrap(), 100);
    // Two blocks of subsidy plus one unit of fee each.
    assert_eq!(node.balance("miner").unwrap(), 2 * 502);
    assert_eq!(node.ledger().blockchain.len(), 3);
}

#[test]
fn test_example_scenario_with_signatures() {
    let node = example(CheckSigPolicy::Verify);
    assert_eq!(node.balance("alice").unwrap(), 399);
    assert_eq!(node.balance("bob").unwrap(), 100);
}

#[test]
fn test_double_spend_is_refused_without_touching_staging() {
    let mut node = example(CheckSigPolicy::Stubbed);
    let first_block = node.block(1).unwrap().clone();
    let spent = OutPoint::new(first_block.transactions[1].hash(), 0);

    let wallet = node.wallet_mut("alice").unwrap();
    wallet.stage_output(1, "OP_1").unwrap();
    let inputs_before = wallet.staged_inputs().to_vec();
    let outputs_before = wallet.staged_outputs().to_vec();

    let unlock = script::unlock_pubkey(wallet.keypair(), &spent);
    assert_eq!(
        wallet.try_unlock(spent.tx_hash, spent.index, &unlock),
        Err(WalletError::AlreadySpent(spent))
    );
    assert_eq!(wallet.staged_inputs(), inputs_before.as_slice());
    assert_eq!(wallet.staged_outputs(), outputs_before.as_slice());
}

#[test]
fn test_conflicting_transfers_only_one_mined() {
    let mut node = Node::new(config(CheckSigPolicy::Verify));
    node.create_wallet("alice").unwrap();
    node.create_wallet("bob").unwrap();
    node.add_miner("alice").unwrap();
    let genesis = node.mine(None).unwrap();
    let reward = OutPoint::new(genesis.block.transactions[0].hash(), 0);

    // Two transactions built against the same snapshot spend one output.
    let bob = node.wallet("bob").unwrap().lock_script();
    let wallet = node.wallet_mut("alice").unwrap();
    wallet.unlock_own(reward).unwrap();
    wallet.stage_output(100, &bob).unwrap();
    let a = wallet.build_transaction(0).unwrap();
    wallet.unlock_own(reward).unwrap();
    wallet.stage_output(200, &bob).unwrap();
    let b = wallet.build_transaction(0).unwrap();
    node.submit(a.clone()).unwrap();
    node.submit(b.clone()).unwrap();

    let mined = node.mine(None).unwrap();
    assert_eq!(mined.accepted, vec![a.hash()]);
    assert_eq!(mined.rejected.len(), 1);
    assert_eq!(
        mined.rejected[0],
        (b.hash(), TransactionError::AlreadySpent(reward))
    );
    assert!(node.mempool().is_empty());
    assert_eq!(node.balance("bob").unwrap(), 100);
}

#[test]
fn test_forged_unlock_rejected_by_miner() {
    let mut node = Node::new(config(CheckSigPolicy::Verify));
    node.create_wallet("alice").unwrap();
    node.create_wallet("mallory").unwrap();
    node.add_miner("alice").unwrap();
    let genesis = node.mine(None).unwrap();
    let reward = OutPoint::new(genesis.block.transactions[0].hash(), 0);

    // mallory presents alice's key with her own signature.
    let alice = node.wallet("alice").unwrap().public_key();
    let wallet = node.wallet("mallory").unwrap();
    let signature = wallet.keypair().sign_hash(&reward.spend_message());
    let forged = format!("\"{}\" \"{}\"", signature.to_hex(), alice.to_hex());
    let tx = scriptchain_core::Transaction::new(
        vec![scriptchain_core::TxInput::new(reward, forged)],
        vec![TxOutput::new(500, wallet.lock_script())],
    );
    node.submit(tx.clone()).unwrap();

    let mined = node.mine(None).unwrap();
    assert!(mined.accepted.is_empty());
    assert_eq!(mined.rejected[0], (tx.hash(), TransactionError::UnlockFailed(reward)));
    assert_eq!(node.balance("mallory").unwrap(), 0);
}

#[test]
fn test_inputless_transaction_never_mined() {
    let mut node = Node::new(config(CheckSigPolicy::Stubbed));
    node.create_wallet("alice").unwrap();
    node.add_miner("alice").unwrap();
    node.mine(None).unwrap();

    let tx = scriptchain_core::Transaction::new(vec![], vec![TxOutput::new(0, "OP_1")]);
    node.submit(tx.clone()).unwrap();
    let mined = node.mine(None).unwrap();
    assert!(mined.accepted.is_empty());
    assert_eq!(mined.rejected, vec![(tx.hash(), TransactionError::NoInputs)]);
    assert!(!node.ledger().utxos.contains(&OutPoint::new(tx.hash(), 0)));

    // Resubmitting the same content is refused again.
    node.submit(tx.clone()).unwrap();
    let mined = node.mine(None).unwrap();
    assert_eq!(mined.rejected, vec![(tx.hash(), TransactionError::NoInputs)]);
    assert!(!node.ledger().utxos.contains(&OutPoint::new(tx.hash(), 0)));
}

#[test]
fn test_chain_invariants_hold() {
    let mut node = Node::new(NodeConfig {
        miner: MinerConfig {
            difficulty: DifficultyPolicy::Random { min: 1, max: 6 },
            seed: Some(7),
            ..MinerConfig::default()
        },
        ..NodeConfig::default()
    });
    for name in ["a", "b", "c"] {
        node.create_wallet(name).unwrap();
    }
    node.add_miner("a").unwrap();
    node.add_miner("b").unwrap();
    node.mine(Some("a")).unwrap();
    node.mine(Some("b")).unwrap();
    for _ in 0..4 {
        node.transfer("a", "c", 1_000, None).unwrap();
        node.transfer("b", "c", 2_000, Some("b")).unwrap();
        node.mine(None).unwrap();
    }

    let ledger = node.ledger();
    let blocks = ledger.blockchain.blocks();
    for (height, block) in blocks.iter().enumerate() {
        assert_eq!(block.height(), height as u64);
        assert_eq!(
            block.hash().leading_zero_bits(),
            block.header.difficulty,
            "block {} proof-of-work",
            height
        );
        let hashes = block.tx_hashes();
        assert_eq!(merkle_root(&hashes), Some(block.header.merkle_root));
        if height > 0 {
            assert_eq!(block.header.previous_hash, blocks[height - 1].hash());
        }

        for tx in block.transactions.iter().filter(|tx| !tx.is_coinbase) {
            let inputs: u64 = tx
                .inputs
                .iter()
                .map(|i| {
                    ledger
                        .blockchain
                        .find_output(&i.source_tx_hash, i.output_index)
                        .unwrap()
                        .value
                })
                .sum();
            assert!(inputs >= tx.total_output());
            for input in &tx.inputs {
                assert!(!ledger.utxos.contains(&input.outpoint()));
            }
        }
    }

    assert_eq!(node.balance("c").unwrap(), 4 * 3_000);
    assert_eq!(node.history().len(), 6);
}

#[test]
fn test_transfer_errors() {
    let mut node = Node::new(config(CheckSigPolicy::Stubbed));
    node.create_wallet("alice").unwrap();
    assert!(matches!(
        node.transfer("alice", "nobody", 1, None),
        Err(NodeError::UnknownWallet(_))
    ));
    node.create_wallet("bob").unwrap();
    assert!(matches!(
        node.transfer("alice", "bob", 1, None),
        Err(NodeError::Wallet(WalletError::InsufficientFunds { .. }))
    ));
}
