use crate::models::options::EccLevel;

/// Maximum content length per error-correction level.
///
/// These thresholds are fixed per level regardless of the text's actual
/// encoding mode (numeric/alphanumeric/byte), which real QR capacity depends
/// on. This is intentional, documented behavior: the guard exists to reject
/// obviously oversized input before the encoder runs, not to reproduce the
/// symbol version tables.
pub const fn capacity_for(level: EccLevel) -> usize {
    match level {
        EccLevel::L => 2953,
        EccLevel::M => 2331,
        EccLevel::Q => 1663,
        EccLevel::H => 1273,
    }
}

/// Length of the content as the guard counts it (Unicode scalar values).
pub fn content_length(content: &str) -> usize {
    content.chars().count()
}

/// The capacity guard: true when the content cannot fit at the given level.
///
/// Must be evaluated strictly before the encoder is invoked so that the
/// anticipated, common "too long" condition never depends on the external
/// encoder's own failure behavior.
pub fn is_too_long(content: &str, level: EccLevel) -> bool {
    content_length(content) > capacity_for(level)
}
