/// 流量分級邊界，左閉右開；最後一級往上開放
pub const BIN_EDGES: [u64; 8] = [0, 10, 50, 100, 500, 1000, 5000, 100_000];

const BIN_LABELS: [&str; 7] = [
    "0-10",
    "10-50",
    "50-100",
    "100-500",
    "500-1000",
    "1000-5000",
    "5000+",
];

/// Maps a count to its styling bin. Total over all `u64`; never used for filtering.
pub fn bin(count: u64) -> &'static str {
    let index = BIN_EDGES[1..BIN_EDGES.len() - 1]
        .iter()
        .take_while(|&&edge| count >= edge)
        .count();
    BIN_LABELS[index]
}

pub fn labels() -> &'static [&'static str] {
    &BIN_LABELS
}
