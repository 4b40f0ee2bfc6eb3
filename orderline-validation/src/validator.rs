//! Order validator.
//!
//! Runs four phases in order (header, delivery, payment, items) and stops at
//! the first defect. The only mutation is upper-casing `payment.currency`
//! once it has been accepted as three ASCII letters.

use chrono::{Months, Utc};
use orderline_core::{
    Delivery, Item, Order, Payment, Section, Timestamp, ValidationError, MAX_ORDER_AGE_YEARS,
    MIN_ITEM_STATUS, ORDER_UID_MAX_LEN, ORDER_UID_MIN_LEN, SUPPORTED_LOCALES,
};

use crate::rules::{
    parse_address, require_len_between, require_match, CheckResult, Defect, RequireNonEmpty,
    RequireRange, PHONE_RE, ZIP_RE,
};

/// Stateless order validator.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrderValidator;

impl OrderValidator {
    pub fn new() -> Self {
        Self
    }

    /// Validate against the current wall clock.
    pub fn validate(&self, order: Option<&mut Order>) -> Result<(), ValidationError> {
        self.validate_at(order, Utc::now())
    }

    /// Validate with an explicit notion of "now" for the `date_created` window.
    pub fn validate_at(
        &self,
        order: Option<&mut Order>,
        now: Timestamp,
    ) -> Result<(), ValidationError> {
        let order = order.ok_or(ValidationError::MissingOrder)?;

        validate_header(order, now).map_err(|d| d.in_section(Section::Header))?;
        validate_delivery(&order.delivery).map_err(|d| d.in_section(Section::Delivery))?;
        validate_payment(&mut order.payment).map_err(|d| d.in_section(Section::Payment))?;
        validate_items(&order.items)
    }

    /// Owned variant: returns the (normalized) order on success.
    pub fn check(&self, order: Option<Order>) -> Result<Order, ValidationError> {
        let mut order = order.ok_or(ValidationError::MissingOrder)?;
        self.validate(Some(&mut order))?;
        Ok(order)
    }
}

fn validate_header(order: &Order, now: Timestamp) -> CheckResult {
    order.order_uid.require_non_empty("order_uid")?;
    require_len_between(
        &order.order_uid,
        "order_uid",
        ORDER_UID_MIN_LEN,
        ORDER_UID_MAX_LEN,
    )?;
    order.track_number.require_non_empty("track_number")?;
    order.entry.require_non_empty("entry")?;
    order.customer_id.require_non_empty("customer_id")?;
    order.delivery_service.require_non_empty("delivery_service")?;
    order.sm_id.require_positive("sm_id")?;

    if order.date_created > now {
        return Err(Defect::new("date_created", "cannot be in the future"));
    }
    if let Some(horizon) = now.checked_sub_months(Months::new(MAX_ORDER_AGE_YEARS * 12)) {
        if order.date_created < horizon {
            return Err(Defect::new("date_created", "is too old"));
        }
    }

    if !SUPPORTED_LOCALES.contains(&order.locale.as_str()) {
        return Err(Defect::new("locale", "is not supported"));
    }
    Ok(())
}

fn validate_delivery(delivery: &Delivery) -> CheckResult {
    delivery.name.require_non_empty("name")?;
    if delivery.name.chars().count() < 2 {
        return Err(Defect::new("name", "is too short"));
    }

    delivery.phone.require_non_empty("phone")?;
    require_match(&delivery.phone, "phone", &PHONE_RE, "has invalid format")?;

    if let Some(email) = delivery.email.as_deref().filter(|e| !e.is_empty()) {
        if parse_address(email).is_none() {
            return Err(Defect::new("email", "has invalid format"));
        }
    }

    delivery.city.require_non_empty("city")?;
    delivery.address.require_non_empty("address")?;
    delivery.region.require_non_empty("region")?;
    delivery.zip.require_non_empty("zip")?;
    require_match(&delivery.zip, "zip", &ZIP_RE, "has invalid format")
}

fn validate_payment(payment: &mut Payment) -> CheckResult {
    payment.transaction.require_non_empty("transaction")?;
    payment.currency.require_non_empty("currency")?;
    if payment.currency.chars().count() != 3 {
        return Err(Defect::new("currency", "must be 3 characters long"));
    }
    if !payment.currency.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(Defect::new("currency", "must contain only latin letters"));
    }
    payment.currency.make_ascii_uppercase();

    payment.provider.require_non_empty("provider")?;
    payment.amount.require_positive("amount")?;
    payment.delivery_cost.require_non_negative("delivery_cost")?;
    payment.goods_total.require_non_negative("goods_total")?;
    payment.custom_fee.require_non_negative("custom_fee")?;
    payment.bank.require_non_empty("bank")?;
    payment.payment_dt.require_positive("payment_dt")
}

fn validate_items(items: &[Item]) -> Result<(), ValidationError> {
    if items.is_empty() {
        return Err(Defect::new("items", "must contain at least one item").in_section(Section::Items));
    }
    for (index, item) in items.iter().enumerate() {
        validate_item(item).map_err(|d| d.in_item(index))?;
    }
    Ok(())
}

fn validate_item(item: &Item) -> CheckResult {
    item.chrt_id.require_positive("chrt_id")?;
    item.track_number.require_non_empty("track_number")?;
    item.price.require_positive("price")?;
    item.rid.require_non_empty("rid")?;
    item.name.require_non_empty("name")?;
    item.sale.require_between("sale", 0, 100)?;
    item.size.require_non_empty("size")?;
    item.total_price.require_positive("total_price")?;
    item.nm_id.require_positive("nm_id")?;
    item.brand.require_non_empty("brand")?;
    item.status.require_at_least("status", MIN_ITEM_STATUS)
}

// =============================================================================
// TESTS
// =============================================================================
