/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

pub fn normalize(raw: &str) -> String {
    raw.to_lowercase().replace('-', "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_keys() {
        assert_eq!(normalize("buffer_size"), "buffer_size");
        assert_eq!(normalize("Buffer-Size"), "buffer_size");
        assert_eq!(normalize("LOCAL-PATH"), "local_path");
    }
}
