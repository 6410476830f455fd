/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

mod line;
pub(crate) use line::FtpLineDataTransfer;
pub use line::FtpLineDataReceiver;

mod retrieve;
pub(crate) use retrieve::FtpRetrieveDataTransfer;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum FtpTransferType {
    /// TYPE A, used for directory listings
    Ascii,
    /// TYPE I, used for file content
    Image,
}
