use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ProductError;

/// Point-in-time view of a catalog item.
///
/// Both the cached copy and the upstream response use the catalog's wire shape
/// (`{id, name, price, qty}` with a textual price), so a single decoder serves both paths.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductSnapshot {
    pub id: String,
    pub name: String,
    pub unit_price: Decimal,
    pub available_qty: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireProduct {
    id: String,
    name: String,
    price: WirePrice,
    qty: i64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum WirePrice {
    Text(String),
    Number(serde_json::Number),
}

impl WirePrice {
    fn into_text(self) -> String {
        match self {
            WirePrice::Text(text) => text,
            WirePrice::Number(number) => number.to_string(),
        }
    }
}

impl ProductSnapshot {
    pub fn new(id: impl Into<String>, name: impl Into<String>, unit_price: Decimal, available_qty: u32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            unit_price,
            available_qty,
        }
    }

    /// Decodes a catalog payload.
    ///
    /// # Errors
    /// - [`ProductError::Decode`] for malformed JSON or a negative quantity
    /// - [`ProductError::InvalidPrice`] when the price text is not numeric or is negative
    pub fn from_json(bytes: &[u8]) -> Result<Self, ProductError> {
        let wire: WireProduct =
            serde_json::from_slice(bytes).map_err(|e| ProductError::Decode(e.to_string()))?;

        let available_qty = u32::try_from(wire.qty)
            .map_err(|_| ProductError::Decode(format!("quantity out of range: {}", wire.qty)))?;

        let price = wire.price.into_text();
        let unit_price = Decimal::from_str(price.trim())
            .ok()
            .filter(|p| *p >= Decimal::ZERO)
            .ok_or_else(|| ProductError::InvalidPrice {
                product_id: wire.id.clone(),
                price: price.clone(),
            })?;

        Ok(Self {
            id: wire.id,
            name: wire.name,
            unit_price,
            available_qty,
        })
    }

    pub fn to_json(&self) -> String {
        let wire = WireProduct {
            id: self.id.clone(),
            name: self.name.clone(),
            price: WirePrice::Text(self.unit_price.to_string()),
            qty: i64::from(self.available_qty),
        };
        // A struct of strings and integers always serializes.
        serde_json::to_string(&wire).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_textual_price() {
        let body = br#"{"id":"p1","name":"Lamp","price":"25.00","qty":10,"createdAt":"2024-01-01T00:00:00Z"}"#;
        let product = ProductSnapshot::from_json(body).unwrap();
        assert_eq!(product.unit_price, Decimal::new(2500, 2));
        assert_eq!(product.available_qty, 10);
    }

    #[test]
    fn accepts_numeric_price() {
        let product = ProductSnapshot::from_json(br#"{"id":"p1","name":"Lamp","price":12.5,"qty":1}"#).unwrap();
        assert_eq!(product.unit_price, Decimal::new(125, 1));
    }

    #[test]
    fn non_numeric_price_is_invalid_price() {
        let err = ProductSnapshot::from_json(br#"{"id":"p1","name":"Lamp","price":"abc","qty":1}"#).unwrap_err();
        assert_eq!(
            err,
            ProductError::InvalidPrice { product_id: "p1".into(), price: "abc".into() }
        );
    }

    #[test]
    fn negative_price_is_invalid_price() {
        let err = ProductSnapshot::from_json(br#"{"id":"p1","name":"Lamp","price":"-25.00","qty":1}"#).unwrap_err();
        assert_eq!(
            err,
            ProductError::InvalidPrice { product_id: "p1".into(), price: "-25.00".into() }
        );
        assert!(matches!(
            ProductSnapshot::from_json(br#"{"id":"p1","name":"Lamp","price":-1,"qty":1}"#),
            Err(ProductError::InvalidPrice { .. })
        ));
    }

    #[test]
    fn zero_price_is_accepted() {
        let product = ProductSnapshot::from_json(br#"{"id":"p1","name":"Sample","price":"0.00","qty":1}"#).unwrap();
        assert!(product.unit_price.is_zero());
    }

    #[test]
    fn malformed_body_is_decode_error() {
        assert!(matches!(ProductSnapshot::from_json(b"not json"), Err(ProductError::Decode(_))));
        assert!(matches!(
            ProductSnapshot::from_json(br#"{"id":"p1","name":"Lamp","price":"1","qty":-3}"#),
            Err(ProductError::Decode(_))
        ));
    }

    #[test]
    fn cached_form_decodes_back() {
        let product = ProductSnapshot::new("p1", "Lamp", Decimal::new(2500, 2), 10);
        let decoded = ProductSnapshot::from_json(product.to_json().as_bytes()).unwrap();
        assert_eq!(decoded, product);
    }
}
