//! Protocol identifier derivation.
//!
//! Recomputes the conditional-tokens identifiers from their constituent
//! parts so that event correlations can be proven instead of assumed:
//!
//! - condition id: `keccak256(oracle ‖ questionId ‖ outcomeSlotCount)`
//! - collection id: packed keccak of `(conditionId ‖ indexSet)` mapped onto
//!   alt_bn128, combined with the parent collection's point, compressed with
//!   the y-parity flag in bit 254 — the same construction the conditional
//!   tokens contract uses, so derived ids byte-match on-chain values
//! - position (asset) id: `uint256(keccak256(collateral ‖ collectionId))`
//!
//! Everything here is pure and deterministic; no shared state, safe to call
//! concurrently.

use alloy::primitives::{keccak256, Address, B256, U256};

use crate::errors::IndexError;

/// alt_bn128 base field modulus.
const FIELD_P: U256 = U256::from_limbs([
    0x3c208c16d87cfd47,
    0x97816a916871ca8d,
    0xb85045b68181585d,
    0x30644e72e131a029,
]);

/// Curve constant in y² = x³ + B.
const CURVE_B: U256 = U256::from_limbs([3, 0, 0, 0]);

/// The contract rejects conditions with more than 256 outcome slots.
const MAX_OUTCOME_SLOTS: u32 = 256;

/// Recompute a condition id from its defining triple.
pub fn condition_id(
    oracle: Address,
    question_id: B256,
    outcome_slot_count: u32,
) -> Result<B256, IndexError> {
    if !(2..=MAX_OUTCOME_SLOTS).contains(&outcome_slot_count) {
        return Err(IndexError::InvalidInput(format!(
            "outcome_slot_count must be in 2..=256, got {outcome_slot_count}"
        )));
    }
    let mut packed = [0u8; 84];
    packed[..20].copy_from_slice(oracle.as_slice());
    packed[20..52].copy_from_slice(question_id.as_slice());
    packed[52..].copy_from_slice(&U256::from(outcome_slot_count).to_be_bytes::<32>());
    Ok(keccak256(packed))
}

/// Recompute a reported condition id and compare. A disagreement is a data
/// integrity fault on the reporting event, never silently accepted.
pub fn verify_condition_id(
    reported: B256,
    oracle: Address,
    question_id: B256,
    outcome_slot_count: u32,
) -> Result<B256, IndexError> {
    let derived = condition_id(oracle, question_id, outcome_slot_count)?;
    if derived != reported {
        return Err(IndexError::DerivationMismatch {
            question_id,
            reported,
            derived,
        });
    }
    Ok(derived)
}

/// Index set selecting a single outcome slot.
pub fn slot_index_set(slot_index: u32) -> U256 {
    U256::from(1u8) << (slot_index as usize)
}

/// Derive the collection id for `(parentCollectionId, conditionId, indexSet)`.
pub fn collection_id(
    parent_collection_id: B256,
    condition_id: B256,
    index_set: U256,
) -> Result<B256, IndexError> {
    if index_set.is_zero() {
        return Err(IndexError::InvalidInput(
            "index_set must select at least one outcome slot".into(),
        ));
    }

    let mut packed = [0u8; 64];
    packed[..32].copy_from_slice(condition_id.as_slice());
    packed[32..].copy_from_slice(&index_set.to_be_bytes::<32>());
    let seed = U256::from_be_bytes(keccak256(packed).0);

    // Hash-to-curve: walk x forward from the seed until x³ + B is a square.
    // The seed's top bit steers which of the two roots is taken.
    let want_odd = seed.bit(255);
    let mut x = seed;
    let mut y;
    loop {
        x = x.add_mod(U256::from(1u8), FIELD_P);
        let yy = x
            .mul_mod(x, FIELD_P)
            .mul_mod(x, FIELD_P)
            .add_mod(CURVE_B, FIELD_P);
        y = sqrt_mod(yy);
        if y.mul_mod(y, FIELD_P) == yy {
            break;
        }
    }
    if y.bit(0) != want_odd {
        y = FIELD_P - y;
    }

    let parent = U256::from_be_bytes(parent_collection_id.0);
    if !parent.is_zero() {
        let (px, py) = decompress_collection_point(parent)?;
        (x, y) = ec_add(x, y, px, py)?;
    }

    let mut out = x;
    if y.bit(0) {
        out |= U256::from(1u8) << 254usize;
    }
    Ok(B256::from(out.to_be_bytes::<32>()))
}

/// Derive the ERC-1155 position id minted for one collection of a condition.
pub fn position_id(collateral_token: Address, collection_id: B256) -> U256 {
    let mut packed = [0u8; 52];
    packed[..20].copy_from_slice(collateral_token.as_slice());
    packed[20..].copy_from_slice(collection_id.as_slice());
    U256::from_be_bytes(keccak256(packed).0)
}

/// Modular square root; FIELD_P ≡ 3 (mod 4) so x^((p+1)/4) works. The result
/// is only a root when the input is a quadratic residue — callers re-check.
fn sqrt_mod(value: U256) -> U256 {
    let exp = (FIELD_P + U256::from(1u8)) >> 2;
    value.pow_mod(exp, FIELD_P)
}

fn inv_mod(value: U256) -> Result<U256, IndexError> {
    if value.is_zero() {
        return Err(IndexError::InvalidInput(
            "degenerate curve point addition".into(),
        ));
    }
    Ok(value.pow_mod(FIELD_P - U256::from(2u8), FIELD_P))
}

fn sub_mod(a: U256, b: U256) -> U256 {
    a.add_mod(FIELD_P - b, FIELD_P)
}

/// Unpack a compressed collection id (x with y-parity in bit 254) back into
/// an affine point, rejecting values that are not on the curve.
fn decompress_collection_point(raw: U256) -> Result<(U256, U256), IndexError> {
    let odd = raw.bit(254);
    let mask = (U256::from(1u8) << 254usize) - U256::from(1u8);
    let x = raw & mask;
    let yy = x
        .mul_mod(x, FIELD_P)
        .mul_mod(x, FIELD_P)
        .add_mod(CURVE_B, FIELD_P);
    let mut y = sqrt_mod(yy);
    if y.mul_mod(y, FIELD_P) != yy {
        return Err(IndexError::InvalidInput(
            "parent collection id is not a valid curve point".into(),
        ));
    }
    if y.bit(0) != odd {
        y = FIELD_P - y;
    }
    Ok((x, y))
}

/// Affine point addition on alt_bn128.
fn ec_add(x1: U256, y1: U256, x2: U256, y2: U256) -> Result<(U256, U256), IndexError> {
    let lambda = if x1 == x2 {
        if y1 != y2 {
            // P + (-P): the point at infinity has no collection encoding.
            return Err(IndexError::InvalidInput(
                "degenerate curve point addition".into(),
            ));
        }
        let num = x1.mul_mod(x1, FIELD_P).mul_mod(U256::from(3u8), FIELD_P);
        let den = inv_mod(y1.mul_mod(U256::from(2u8), FIELD_P))?;
        num.mul_mod(den, FIELD_P)
    } else {
        let num = sub_mod(y2, y1);
        let den = inv_mod(sub_mod(x2, x1))?;
        num.mul_mod(den, FIELD_P)
    };
    let x3 = sub_mod(sub_mod(lambda.mul_mod(lambda, FIELD_P), x1), x2);
    let y3 = sub_mod(lambda.mul_mod(sub_mod(x1, x3), FIELD_P), y1);
    Ok((x3, y3))
}
