use scriptchain_assembler::assemble;
use scriptchain_core::{script, Keypair, OutPoint, sha256};
use scriptchain_vm::{execute, is_valid_script, CheckSigPolicy, ScriptContext, VmError};

fn run(source: &str) -> Result<scriptchain_vm::ExecutionResult, VmError> {
    execute(assemble(source).unwrap(), ScriptContext::default())
}

#[test]
fn test_one_plus_one_equals_two() {
    let result = run("OP_1 OP_1 OP_ADD OP_2 OP_NUMEQUAL").unwrap();
    assert_eq!(result.stack, vec![vec![1]]);
    assert!(result.is_valid());
}

#[test]
fn test_literal_arithmetic() {
    let result = run("-0x10 20 OP_ADD 4 OP_NUMEQUAL").unwrap();
    assert!(result.is_valid());

    let result = run("1000 -1000 OP_ADD OP_0 OP_NUMEQUAL").unwrap();
    assert!(result.is_valid());
}

#[test]
fn test_negate_and_add() {
    let result = run("OP_1NEGATE OP_1 OP_ADD").unwrap();
    assert_eq!(result.stack, vec![0i64.to_le_bytes().to_vec()]);
    // Eight zero bytes are not the single zero byte.
    assert!(result.is_valid());
}

#[test]
fn test_verify_failure() {
    assert_eq!(run("OP_0 OP_VERIFY"), Err(VmError::VerifyFailed));
    assert_eq!(run("OP_1 OP_2 OP_NUMEQUAL OP_VERIFY"), Err(VmError::VerifyFailed));
}

#[test]
fn test_string_equalverify() {
    assert!(run("\"abc\" \"abc\" OP_EQUALVERIFY OP_TRUE").unwrap().is_valid());
    assert_eq!(
        run("\"abc\" \"abd\" OP_EQUALVERIFY OP_TRUE"),
        Err(VmError::VerifyFailed)
    );
}

#[test]
fn test_hash160_lock() {
    // Lock: the spender must reveal a preimage of a known HASH160.
    let digest = scriptchain_core::hash160(b"secret");
    let mut bytecode = assemble("\"secret\" OP_HASH160").unwrap();
    bytecode.push(20);
    bytecode.extend_from_slice(&digest);
    bytecode.push(0x88);
    bytecode.push(0x51);
    let result = execute(bytecode, ScriptContext::default()).unwrap();
    assert!(result.is_valid());
}

#[test]
fn test_underflow_from_source() {
    assert_eq!(run("OP_ADD"), Err(VmError::StackUnderflow));
    assert_eq!(run("OP_1 OP_CHECKSIG"), Err(VmError::StackUnderflow));
}

#[test]
fn test_pay_to_pubkey_stubbed() {
    let owner = Keypair::generate();
    let thief = Keypair::generate();
    let point = OutPoint::new(sha256(b"funding"), 0);
    let lock = script::pay_to_pubkey(&owner.public_key);

    let good = script::spending_program(&script::unlock_pubkey(&owner, &point), &lock);
    assert!(is_valid_script(assemble(&good).unwrap(), ScriptContext::default()));

    // A different key fails the OP_EQUALVERIFY on the public key.
    let wrong_key = script::spending_program(&script::unlock_pubkey(&thief, &point), &lock);
    assert!(!is_valid_script(assemble(&wrong_key).unwrap(), ScriptContext::default()));
}

#[test]
fn test_pay_to_pubkey_verified() {
    let owner = Keypair::generate();
    let point = OutPoint::new(sha256(b"funding"), 1);
    let lock = script::pay_to_pubkey(&owner.public_key);
    let program = assemble(&script::spending_program(
        &script::unlock_pubkey(&owner, &point),
        &lock,
    ))
    .unwrap();

    let right = ScriptContext::new(CheckSigPolicy::Verify, Some(point.spend_message()));
    assert!(is_valid_script(program.clone(), right));

    let other_point = OutPoint::new(sha256(b"funding"), 2);
    let wrong = ScriptContext::new(CheckSigPolicy::Verify, Some(other_point.spend_message()));
    assert!(!is_valid_script(program.clone(), wrong));

    // The stub accepts a forged signature that real verification rejects.
    let forged = format!(
        "\"{}\" \"{}\"\n{}",
        "00".repeat(64),
        owner.public_key.to_hex(),
        lock
    );
    let forged = assemble(&forged).unwrap();
    assert!(is_valid_script(forged.clone(), ScriptContext::default()));
    assert!(!is_valid_script(forged, right));
}

#[test]
fn test_trailing_comment_in_unlock_does_not_hide_lock() {
    let program = script::spending_program("OP_1 # unlock", "OP_2 OP_NUMEQUAL");
    let result = run(&program).unwrap();
    assert_eq!(result.stack, vec![vec![0]]);
}
