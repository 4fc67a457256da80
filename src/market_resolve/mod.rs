// ============================================================================
// Market Resolve Module - Market Lifecycle & Settlement Funds
// ============================================================================
//
// This module contains the market side of the ledger:
//   - markets: market/option entities, creation and the Open -> Resolved
//     transition
//   - escrow: staged fund movements with compensating reversal
//
// ============================================================================

pub mod escrow;
pub mod markets;

pub use escrow::*;
pub use markets::*;
