//! Request and response types for every Cardex API.

pub mod admin;
pub mod error;
pub mod market;
pub mod notification;
pub mod orders;
pub mod status;
pub mod ws;

pub use error::{ErrorKind, ErrorResponse};
pub use market::{
    CreateListingRequest, InitiateTradeRequest, ListingResponse, SubmitPaymentProofRequest,
    TradeResponse,
};
pub use notification::{NotificationKind, NotificationPayload, NotificationSubject};
pub use orders::{
    CodeResponse, CreateBuyOrderRequest, CreateSellOrderRequest, RateQuery, RateResponse,
    TransactionResponse,
};
pub use status::{Direction, ListingStatus, TradeStatus, TransactionStatus};
