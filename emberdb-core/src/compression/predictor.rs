//! Hash-table value predictors for the double codec
//!
//! Both predictors rebuild identical state on the encode and decode
//! sides from the update sequence alone, so nothing about them appears
//! on the wire. Table sizes must be powers of two; the index mask is
//! `size - 1`.

/// Finite-context-method predictor over 64-bit words
#[derive(Debug, Clone)]
pub struct FcmPredictor {
    table: Vec<u64>,
    last_hash: usize,
    mask: usize,
}

impl FcmPredictor {
    /// Create a predictor with an empty table. `table_size` must be a
    /// power of two.
    pub fn new(table_size: usize) -> Self {
        assert!(
            table_size.is_power_of_two(),
            "predictor table size must be a power of two"
        );
        Self {
            table: vec![0; table_size],
            last_hash: 0,
            mask: table_size - 1,
        }
    }

    /// Predicted bits for the next value
    #[inline]
    pub fn predict_next(&self) -> u64 {
        self.table[self.last_hash]
    }

    /// Feed the actual bits and advance the context hash
    #[inline]
    pub fn update(&mut self, value: u64) {
        self.table[self.last_hash] = value;
        self.last_hash = ((self.last_hash << 6) ^ (value >> 48) as usize) & self.mask;
    }
}

/// Differential variant of [`FcmPredictor`]: the table holds strides
/// and the prediction is `stride + last_value`, which tracks smoothly
/// drifting signals better than the plain context table.
#[derive(Debug, Clone)]
pub struct DfcmPredictor {
    table: Vec<u64>,
    last_hash: usize,
    last_value: u64,
    mask: usize,
}

impl DfcmPredictor {
    /// Create a predictor with an empty table. `table_size` must be a
    /// power of two.
    pub fn new(table_size: usize) -> Self {
        assert!(
            table_size.is_power_of_two(),
            "predictor table size must be a power of two"
        );
        Self {
            table: vec![0; table_size],
            last_hash: 0,
            last_value: 0,
            mask: table_size - 1,
        }
    }

    /// Predicted bits for the next value
    #[inline]
    pub fn predict_next(&self) -> u64 {
        self.table[self.last_hash].wrapping_add(self.last_value)
    }

    /// Feed the actual bits and advance the context hash
    #[inline]
    pub fn update(&mut self, value: u64) {
        let stride = value.wrapping_sub(self.last_value);
        self.table[self.last_hash] = stride;
        self.last_hash = ((self.last_hash << 2) ^ (stride >> 40) as usize) & self.mask;
        self.last_value = value;
    }
}
