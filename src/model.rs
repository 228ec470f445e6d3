use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Order header, identified by its business number.
#[derive(Debug, Deserialize, Serialize, ToSchema, Clone, PartialEq)]
pub struct Order {
    pub id: i64,
    #[serde(rename = "numero")]
    pub number: String,
    #[serde(rename = "cliente")]
    pub customer: String,
}

#[derive(Debug, Deserialize, Serialize, ToSchema, Clone)]
pub struct NewOrder {
    #[serde(rename = "numero")]
    pub number: String,
    #[serde(rename = "cliente")]
    pub customer: String,
}

/// Line entry of an order, addressed by (order number, index).
#[derive(Debug, Deserialize, Serialize, ToSchema, Clone, PartialEq)]
pub struct OrderItem {
    pub id: i64,
    #[serde(rename = "numero")]
    pub order_number: String,
    #[serde(rename = "indice")]
    pub index: i64,
    pub sku: String,
    #[serde(rename = "produto")]
    pub product_name: String,
    #[serde(rename = "preco")]
    pub unit_price: f64,
    #[serde(rename = "qtd")]
    pub quantity: i64,
}

/// Item body; the order number comes from the request path.
#[derive(Debug, Deserialize, Serialize, ToSchema, Clone)]
pub struct NewOrderItem {
    #[serde(rename = "indice")]
    pub index: i64,
    pub sku: String,
    #[serde(rename = "produto")]
    pub product_name: String,
    #[serde(rename = "preco")]
    pub unit_price: f64,
    #[serde(rename = "qtd")]
    pub quantity: i64,
}

#[derive(Debug, Default, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProductQuery {
    /// Exact, case-sensitive product name; `produto` is accepted too
    pub product: String,
}

impl ProductQuery {
    /// First `product`/`produto` value wins; absent means the empty name.
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let product = pairs
            .into_iter()
            .find(|(key, _)| key == "product" || key == "produto")
            .map(|(_, value)| value)
            .unwrap_or_default();
        Self { product }
    }
}

#[derive(Debug, Deserialize, Serialize, ToSchema, Clone, PartialEq, Eq)]
pub struct ErrorBody {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn order_uses_wire_names() {
        let order = Order { id: 1, number: "PED-1".into(), customer: "Ana".into() };
        assert_eq!(
            serde_json::to_value(&order).unwrap(),
            json!({"id": 1, "numero": "PED-1", "cliente": "Ana"})
        );
    }

    #[test]
    fn new_item_ignores_id_and_number() {
        let item: NewOrderItem = serde_json::from_value(json!({
            "id": 42, "numero": "OTHER", "indice": 0, "sku": "SKU1",
            "produto": "Widget", "preco": 9.99, "qtd": 2
        }))
        .unwrap();
        assert_eq!(item.index, 0);
        assert_eq!(item.product_name, "Widget");
        assert_eq!(item.quantity, 2);
    }

    #[test]
    fn product_query_takes_first_value() {
        let pairs = vec![
            ("other".to_string(), "x".to_string()),
            ("produto".to_string(), "Gadget".to_string()),
            ("product".to_string(), "Widget".to_string()),
        ];
        assert_eq!(ProductQuery::from_pairs(pairs).product, "Gadget");
        assert_eq!(ProductQuery::from_pairs(Vec::new()).product, "");
    }

    #[test]
    fn new_order_requires_customer() {
        let res = serde_json::from_value::<NewOrder>(json!({"numero": "PED-1"}));
        assert!(res.is_err());
    }
}
