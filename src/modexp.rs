use num_bigint::BigUint;
use num_traits::One;

/// Binary (square-and-multiply) modular exponentiation.
///
/// Scans the exponent's bits most-significant-first: the accumulator is
/// squared modulo `modulus` on every step and multiplied by `base` when the
/// bit is set. Returns a value in `[0, modulus)`; `exponent = 0` yields
/// `1 mod modulus`.
pub fn mod_pow(base: &BigUint, exponent: &BigUint, modulus: &BigUint) -> BigUint {
    let mut acc = BigUint::one() % modulus;
    for i in (0..exponent.bits()).rev() {
        acc = &acc * &acc % modulus;
        if exponent.bit(i) {
            acc = &acc * base % modulus;
        }
    }
    acc
}
