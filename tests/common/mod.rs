#![allow(dead_code)]

use monosub_eval::EvaluationParams;

pub const DICKENS: &str = "itwasthebestoftimesitwastheworstoftimesitwastheageofwisdomitwastheageoffoolishnessitwastheepochofbeliefitwastheepochofincredulityitwastheseasonoflightitwastheseasonofdarknessitwasthespringofhope";

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// `len` symbols cut from a repeated English passage.
pub fn plaintext(len: usize) -> String {
    DICKENS.chars().cycle().take(len).collect()
}

/// Pools small enough for debug-mode test runs.
pub fn quick_params() -> EvaluationParams {
    EvaluationParams::builder()
        .global_num_keys(150)
        .global_max_pairs(3000)
        .local_radii(vec![1, 2])
        .local_seeds(2)
        .local_per_seed(20)
        .local_max_pairs(2000)
        .build()
}
