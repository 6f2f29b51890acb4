use std::collections::{BTreeMap, HashMap};

use aws_config::BehaviorVersion;
use aws_sdk_dynamodb::Client;
use aws_sdk_dynamodb::operation::update_item::UpdateItemError;
use aws_sdk_dynamodb::types::{AttributeValue, ReturnValue};
use tracing::debug;

use crate::error::CoreError;
use crate::model::{AttrValue, AttributeName, Decimal, PRODUCT_ID_ATTRIBUTE, Product, ProductId};
use crate::store::{ProductStore, ScanPage};

/// DynamoDB client wrapper for product storage.
#[derive(Clone)]
pub struct DynamoStore {
    client: Client,
    table_name: String,
}

impl DynamoStore {
    /// Create a new `DynamoStore` by loading AWS configuration from the
    /// environment and constructing a DynamoDB client.
    ///
    /// `endpoint_url` overrides the service endpoint, e.g. for DynamoDB Local.
    pub async fn new(table_name: impl Into<String>, endpoint_url: Option<&str>) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(url) = endpoint_url {
            loader = loader.endpoint_url(url);
        }
        let config = loader.load().await;
        Self::from_client(Client::new(&config), table_name)
    }

    pub fn from_client(client: Client, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
        }
    }

    /// The DynamoDB table name.
    pub fn table_name(&self) -> &str {
        &self.table_name
    }
}

impl ProductStore for DynamoStore {
    async fn get_product(&self, id: &ProductId) -> Result<Option<Product>, CoreError> {
        let output = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key(PRODUCT_ID_ATTRIBUTE, key_value(id))
            .send()
            .await
            .map_err(aws_sdk_dynamodb::Error::from)?;

        output.item.map(item_to_product).transpose()
    }

    async fn put_product(&self, product: &Product) -> Result<(), CoreError> {
        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(product_to_item(product)))
            .send()
            .await
            .map_err(aws_sdk_dynamodb::Error::from)?;

        Ok(())
    }

    async fn scan_products(
        &self,
        exclusive_start_key: Option<&ProductId>,
    ) -> Result<ScanPage, CoreError> {
        let start_key = exclusive_start_key
            .map(|id| HashMap::from([(PRODUCT_ID_ATTRIBUTE.to_string(), key_value(id))]));

        let output = self
            .client
            .scan()
            .table_name(&self.table_name)
            .set_exclusive_start_key(start_key)
            .send()
            .await
            .map_err(aws_sdk_dynamodb::Error::from)?;

        let items = output
            .items
            .unwrap_or_default()
            .into_iter()
            .map(item_to_product)
            .collect::<Result<Vec<_>, _>>()?;

        let last_evaluated_key = match output
            .last_evaluated_key
            .as_ref()
            .and_then(|key| key.get(PRODUCT_ID_ATTRIBUTE))
        {
            Some(AttributeValue::S(s)) => Some(ProductId::new(s.clone())?),
            Some(_) => return Err(CoreError::UnsupportedAttribute(PRODUCT_ID_ATTRIBUTE.into())),
            None => None,
        };

        debug!(
            table = %self.table_name,
            count = items.len(),
            more = last_evaluated_key.is_some(),
            "scanned page"
        );

        Ok(ScanPage {
            items,
            last_evaluated_key,
        })
    }

    async fn update_attribute(
        &self,
        id: &ProductId,
        name: &AttributeName,
        value: &AttrValue,
    ) -> Result<BTreeMap<String, AttrValue>, CoreError> {
        // Names and values only ever reach the expression through placeholders.
        let result = self
            .client
            .update_item()
            .table_name(&self.table_name)
            .key(PRODUCT_ID_ATTRIBUTE, key_value(id))
            .update_expression("SET #attr = :value")
            .condition_expression("attribute_exists(#key)")
            .expression_attribute_names("#attr", name.as_ref())
            .expression_attribute_names("#key", PRODUCT_ID_ATTRIBUTE)
            .expression_attribute_values(":value", to_attribute_value(value))
            .return_values(ReturnValue::UpdatedNew)
            .send()
            .await;

        let output = match result {
            Ok(output) => output,
            Err(e)
                if e.as_service_error()
                    .is_some_and(UpdateItemError::is_conditional_check_failed_exception) =>
            {
                return Err(CoreError::NotFound(format!("product {id}")));
            }
            Err(e) => return Err(aws_sdk_dynamodb::Error::from(e).into()),
        };

        output
            .attributes
            .unwrap_or_default()
            .into_iter()
            .map(|(k, v)| {
                let v = from_attribute_value(&k, v)?;
                Ok((k, v))
            })
            .collect()
    }

    async fn delete_product(&self, id: &ProductId) -> Result<(), CoreError> {
        self.client
            .delete_item()
            .table_name(&self.table_name)
            .key(PRODUCT_ID_ATTRIBUTE, key_value(id))
            .send()
            .await
            .map_err(aws_sdk_dynamodb::Error::from)?;

        Ok(())
    }
}

fn key_value(id: &ProductId) -> AttributeValue {
    AttributeValue::S(id.to_string())
}

fn product_to_item(product: &Product) -> HashMap<String, AttributeValue> {
    product
        .attributes()
        .iter()
        .map(|(k, v)| (k.clone(), to_attribute_value(v)))
        .collect()
}

fn item_to_product(item: HashMap<String, AttributeValue>) -> Result<Product, CoreError> {
    let attributes = item
        .into_iter()
        .map(|(k, v)| {
            let v = from_attribute_value(&k, v)?;
            Ok((k, v))
        })
        .collect::<Result<BTreeMap<_, _>, CoreError>>()?;

    Ok(Product::from_attributes(attributes)?)
}

fn to_attribute_value(value: &AttrValue) -> AttributeValue {
    match value {
        AttrValue::Null => AttributeValue::Null(true),
        AttrValue::Bool(b) => AttributeValue::Bool(*b),
        AttrValue::Number(d) => AttributeValue::N(d.as_str().to_string()),
        AttrValue::String(s) => AttributeValue::S(s.clone()),
        AttrValue::List(items) => AttributeValue::L(items.iter().map(to_attribute_value).collect()),
        AttrValue::Map(fields) => AttributeValue::M(
            fields
                .iter()
                .map(|(k, v)| (k.clone(), to_attribute_value(v)))
                .collect(),
        ),
    }
}

/// Convert a stored attribute. `name` is only used for error reporting.
fn from_attribute_value(name: &str, value: AttributeValue) -> Result<AttrValue, CoreError> {
    Ok(match value {
        AttributeValue::Null(_) => AttrValue::Null,
        AttributeValue::Bool(b) => AttrValue::Bool(b),
        AttributeValue::N(n) => AttrValue::Number(Decimal::new(n)?),
        AttributeValue::S(s) => AttrValue::String(s),
        AttributeValue::L(items) => AttrValue::List(
            items
                .into_iter()
                .map(|v| from_attribute_value(name, v))
                .collect::<Result<_, _>>()?,
        ),
        AttributeValue::M(fields) => AttrValue::Map(
            fields
                .into_iter()
                .map(|(k, v)| {
                    let v = from_attribute_value(name, v)?;
                    Ok((k, v))
                })
                .collect::<Result<_, CoreError>>()?,
        ),
        AttributeValue::Ss(strings) => {
            AttrValue::List(strings.into_iter().map(AttrValue::String).collect())
        }
        AttributeValue::Ns(numbers) => AttrValue::List(
            numbers
                .into_iter()
                .map(|n| Ok(AttrValue::Number(Decimal::new(n)?)))
                .collect::<Result<_, CoreError>>()?,
        ),
        _ => return Err(CoreError::UnsupportedAttribute(name.to_string())),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_dynamodb::operation::get_item::GetItemOutput;
    use aws_sdk_dynamodb::operation::scan::ScanOutput;
    use aws_sdk_dynamodb::operation::update_item::UpdateItemOutput;
    use aws_sdk_dynamodb::primitives::Blob;
    use aws_sdk_dynamodb::types::error::{ConditionalCheckFailedException, ResourceNotFoundException};
    use aws_smithy_mocks::{RuleMode, mock, mock_client};

    fn sample_product() -> Product {
        let mut dims = BTreeMap::new();
        dims.insert("w".to_string(), AttrValue::Number(Decimal::from(3)));
        dims.insert("h".to_string(), AttrValue::Null);

        Product::new(ProductId::new("10001").unwrap())
            .with_attribute(AttributeName::new("name").unwrap(), "desk lamp")
            .with_attribute(
                AttributeName::new("price").unwrap(),
                Decimal::new("19.99").unwrap(),
            )
            .with_attribute(AttributeName::new("inStock").unwrap(), true)
            .with_attribute(
                AttributeName::new("tags").unwrap(),
                AttrValue::List(vec!["home".into(), "light".into()]),
            )
            .with_attribute(AttributeName::new("dims").unwrap(), AttrValue::Map(dims))
    }

    #[test]
    fn item_conversion_preserves_record() {
        let product = sample_product();
        let item = product_to_item(&product);

        assert_eq!(
            item.get("productId"),
            Some(&AttributeValue::S("10001".to_string()))
        );
        assert_eq!(item.get("price"), Some(&AttributeValue::N("19.99".to_string())));

        let back = item_to_product(item).unwrap();
        assert_eq!(back, product);
    }

    #[test]
    fn numbers_keep_exact_text() {
        let value = from_attribute_value("qty", AttributeValue::N("1.10".into())).unwrap();
        match value {
            AttrValue::Number(d) => assert_eq!(d.as_str(), "1.10"),
            other => panic!("unexpected value: {other:?}"),
        }
    }

    #[test]
    fn sets_become_lists() {
        let strings =
            from_attribute_value("tags", AttributeValue::Ss(vec!["a".into(), "b".into()])).unwrap();
        assert_eq!(strings, AttrValue::List(vec!["a".into(), "b".into()]));

        let numbers = from_attribute_value("sizes", AttributeValue::Ns(vec!["1".into()])).unwrap();
        assert_eq!(numbers, AttrValue::List(vec![AttrValue::Number(Decimal::from(1))]));
    }

    #[test]
    fn binary_attributes_are_rejected() {
        let err = from_attribute_value("blob", AttributeValue::B(Blob::new(vec![1, 2]))).unwrap_err();
        assert!(matches!(err, CoreError::UnsupportedAttribute(name) if name == "blob"));
    }

    #[test]
    fn item_without_key_is_invalid() {
        let item = HashMap::from([("name".to_string(), AttributeValue::S("x".into()))]);
        assert!(matches!(item_to_product(item), Err(CoreError::Model(_))));
    }

    // -- Requests against a mocked client --

    fn store(client: Client) -> DynamoStore {
        DynamoStore::from_client(client, "products")
    }

    fn keyed_item(id: &str) -> HashMap<String, AttributeValue> {
        HashMap::from([(PRODUCT_ID_ATTRIBUTE.to_string(), AttributeValue::S(id.into()))])
    }

    #[tokio::test]
    async fn update_passes_names_only_through_placeholders() {
        const NAME: &str = "price = :value REMOVE #key";

        let update = mock!(Client::update_item)
            .match_requests(|req| {
                req.table_name() == Some("products")
                    && req.key().and_then(|k| k.get(PRODUCT_ID_ATTRIBUTE))
                        == Some(&AttributeValue::S("10001".into()))
                    && req.update_expression() == Some("SET #attr = :value")
                    && req.condition_expression() == Some("attribute_exists(#key)")
                    && req.expression_attribute_names().is_some_and(|names| {
                        names.len() == 2
                            && names.get("#attr").map(String::as_str) == Some(NAME)
                            && names.get("#key").map(String::as_str) == Some(PRODUCT_ID_ATTRIBUTE)
                    })
                    && req.expression_attribute_values().is_some_and(|values| {
                        values.get(":value") == Some(&AttributeValue::N("9.99".into()))
                    })
                    && req.return_values() == Some(&ReturnValue::UpdatedNew)
            })
            .then_output(|| {
                UpdateItemOutput::builder()
                    .attributes(NAME, AttributeValue::N("9.99".into()))
                    .build()
            });
        let client = mock_client!(aws_sdk_dynamodb, [&update]);

        let updated = store(client)
            .update_attribute(
                &ProductId::new("10001").unwrap(),
                &AttributeName::new(NAME).unwrap(),
                &AttrValue::Number(Decimal::new("9.99").unwrap()),
            )
            .await
            .unwrap();

        assert_eq!(update.num_calls(), 1);
        assert_eq!(
            updated,
            BTreeMap::from([(
                NAME.to_string(),
                AttrValue::Number(Decimal::new("9.99").unwrap())
            )])
        );
    }

    #[tokio::test]
    async fn failed_existence_condition_is_not_found() {
        let update = mock!(Client::update_item).then_error(|| {
            UpdateItemError::ConditionalCheckFailedException(
                ConditionalCheckFailedException::builder()
                    .message("The conditional request failed")
                    .build(),
            )
        });
        let client = mock_client!(aws_sdk_dynamodb, [&update]);

        let err = store(client)
            .update_attribute(
                &ProductId::new("ghost").unwrap(),
                &AttributeName::new("price").unwrap(),
                &AttrValue::Null,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, CoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn other_update_failures_stay_store_errors() {
        let update = mock!(Client::update_item).then_error(|| {
            UpdateItemError::ResourceNotFoundException(
                ResourceNotFoundException::builder()
                    .message("Requested resource not found")
                    .build(),
            )
        });
        let client = mock_client!(aws_sdk_dynamodb, [&update]);

        let err = store(client)
            .update_attribute(
                &ProductId::new("1").unwrap(),
                &AttributeName::new("price").unwrap(),
                &AttrValue::Null,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, CoreError::Dynamo(_)));
    }

    #[tokio::test]
    async fn scan_resumes_from_last_evaluated_key() {
        let first = mock!(Client::scan)
            .match_requests(|req| req.exclusive_start_key().is_none())
            .then_output(|| {
                ScanOutput::builder()
                    .items(keyed_item("a"))
                    .items(keyed_item("b"))
                    .last_evaluated_key(PRODUCT_ID_ATTRIBUTE, AttributeValue::S("b".into()))
                    .build()
            });
        let second = mock!(Client::scan)
            .match_requests(|req| {
                req.exclusive_start_key()
                    .and_then(|k| k.get(PRODUCT_ID_ATTRIBUTE))
                    == Some(&AttributeValue::S("b".into()))
            })
            .then_output(|| ScanOutput::builder().items(keyed_item("c")).build());
        let client = mock_client!(aws_sdk_dynamodb, RuleMode::MatchAny, [&first, &second]);
        let store = store(client);

        let page = store.scan_products(None).await.unwrap();
        let ids: Vec<&str> = page.items.iter().map(|p| p.id().as_ref()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        let next = page.last_evaluated_key.clone().unwrap();
        assert_eq!(next.as_ref(), "b");

        let page = store.scan_products(Some(&next)).await.unwrap();
        let ids: Vec<&str> = page.items.iter().map(|p| p.id().as_ref()).collect();
        assert_eq!(ids, vec!["c"]);
        assert!(page.last_evaluated_key.is_none());

        assert_eq!(first.num_calls(), 1);
        assert_eq!(second.num_calls(), 1);
    }

    #[tokio::test]
    async fn get_distinguishes_missing_items() {
        let get = mock!(Client::get_item)
            .match_requests(|req| {
                req.key().and_then(|k| k.get(PRODUCT_ID_ATTRIBUTE))
                    == Some(&AttributeValue::S("here".into()))
            })
            .then_output(|| {
                GetItemOutput::builder()
                    .item(PRODUCT_ID_ATTRIBUTE, AttributeValue::S("here".into()))
                    .item("price", AttributeValue::N("19.99".into()))
                    .build()
            });
        let missing = mock!(Client::get_item).then_output(|| GetItemOutput::builder().build());
        let client = mock_client!(aws_sdk_dynamodb, RuleMode::MatchAny, [&get, &missing]);
        let store = store(client);

        let found = store
            .get_product(&ProductId::new("here").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            found.get("price"),
            Some(&AttrValue::Number(Decimal::new("19.99").unwrap()))
        );

        let absent = store.get_product(&ProductId::new("gone").unwrap()).await.unwrap();
        assert!(absent.is_none());
    }
}
