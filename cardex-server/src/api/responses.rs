//! Conversions from engine records (DB models) into API models.
//!
//! Records reaching these functions have already been redacted by the
//! engine for the caller, so `code` is copied through as is.

use cardex_core::engine::ResolvedRate;
use cardex_core::entities::gift_card::{CountryRate, GiftCard};
use cardex_core::entities::listing::Listing;
use cardex_core::entities::trade::Trade;
use cardex_core::entities::transaction::CardTransaction;
use cardex_core::utils::unix_timestamp;
use cardex_sdk::objects::admin::CardResponse;
use cardex_sdk::objects::{ListingResponse, RateResponse, TradeResponse, TransactionResponse};

pub fn transaction_response(r: &CardTransaction) -> TransactionResponse {
    TransactionResponse {
        transaction_id: r.transaction_id,
        user_id: r.user_id,
        direction: r.direction.into(),
        card_id: r.card_id,
        card_name: r.card_name.clone(),
        amount: r.amount,
        quantity: r.quantity,
        quoted_price: r.quoted_price,
        country: r.country.as_ref().map(ToString::to_string),
        status: r.status.into(),
        code: r.code.clone(),
        evidence_ref: r.evidence_ref.clone(),
        payment_method: r.payment_method.clone(),
        payment_details: r.payment_details.clone(),
        created_at: unix_timestamp(r.created_at),
        updated_at: unix_timestamp(r.updated_at),
    }
}

pub fn listing_response(l: &Listing) -> ListingResponse {
    ListingResponse {
        listing_id: l.listing_id,
        seller_id: l.seller_id,
        card_name: l.card_name.clone(),
        amount: l.amount,
        price: l.price,
        currency: l.currency.to_string(),
        country: l.country.as_ref().map(ToString::to_string),
        format: l.format.clone(),
        description: l.description.clone(),
        status: l.status.into(),
        created_at: unix_timestamp(l.created_at),
        updated_at: unix_timestamp(l.updated_at),
    }
}

pub fn trade_response(t: &Trade) -> TradeResponse {
    TradeResponse {
        trade_id: t.trade_id,
        listing_id: t.listing_id,
        buyer_id: t.buyer_id,
        seller_id: t.seller_id,
        amount: t.amount,
        price: t.price,
        currency: t.currency.to_string(),
        status: t.status.into(),
        payment_method: t.payment_method.clone(),
        payment_proof_ref: t.payment_proof_ref.clone(),
        code: t.code.clone(),
        notes: t.notes.clone(),
        created_at: unix_timestamp(t.created_at),
        updated_at: unix_timestamp(t.updated_at),
    }
}

pub fn rate_response(resolved: &ResolvedRate) -> RateResponse {
    RateResponse {
        card_id: resolved.card.card_id,
        country: resolved.country.as_ref().map(ToString::to_string),
        buy_rate: resolved.rate.buy_rate,
        sell_rate: resolved.rate.sell_rate,
        is_override: resolved.is_override,
    }
}

pub fn country_rate_response(rate: &CountryRate) -> RateResponse {
    RateResponse {
        card_id: rate.card_id,
        country: Some(rate.country_code.to_string()),
        buy_rate: rate.buy_rate,
        sell_rate: rate.sell_rate,
        is_override: true,
    }
}

pub fn card_response(card: &GiftCard) -> CardResponse {
    CardResponse {
        card_id: card.card_id,
        name: card.name.clone(),
        active: card.active,
        buy_rate: card.buy_rate,
        sell_rate: card.sell_rate,
        updated_at: unix_timestamp(card.updated_at),
    }
}
