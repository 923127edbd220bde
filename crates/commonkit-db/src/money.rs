//! Money values backed by two concrete columns.
//!
//! A [`MoneyField`] is a [`NonDatabaseField`] that reads and writes an
//! amount column and a currency column on a model instance and exposes them
//! as one [`Money`] value.

use std::fmt;
use std::str::FromStr;

use commonkit_core::{CommonkitError, CommonkitResult};
use rust_decimal::Decimal;

use crate::fields::NonDatabaseField;
use crate::model::{Model, ModelMeta};
use crate::value::Value;

/// An amount of money in a given currency.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Money {
    /// The amount, kept as a fixed-precision decimal.
    pub amount: Decimal,
    /// The currency code (e.g. "EUR").
    pub currency: String,
}

impl Money {
    /// Creates a new `Money` value.
    pub fn new(amount: Decimal, currency: impl Into<String>) -> Self {
        Self {
            amount,
            currency: currency.into(),
        }
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount, self.currency)
    }
}

/// What can be assigned through a [`MoneyField`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoneyInput {
    /// A full money value; both columns are written.
    Money(Money),
    /// A bare amount; the currency column gets the declared default.
    Amount(Decimal),
}

impl From<Money> for MoneyInput {
    fn from(m: Money) -> Self {
        Self::Money(m)
    }
}

impl From<Decimal> for MoneyInput {
    fn from(d: Decimal) -> Self {
        Self::Amount(d)
    }
}

/// A non-database field combining an amount column and a currency column.
///
/// # Examples
///
/// ```
/// use commonkit_db::money::MoneyField;
///
/// let field = MoneyField::new();
/// assert_eq!(
///     field.to_string(),
///     "MoneyField(amount_field=price_amount, currency_field=price_currency)"
/// );
/// ```
#[derive(Debug, Clone)]
pub struct MoneyField {
    /// The underlying private field.
    pub field: NonDatabaseField,
    /// Name of the concrete amount column.
    pub amount_field: String,
    /// Name of the concrete currency column.
    pub currency_field: String,
}

impl Default for MoneyField {
    fn default() -> Self {
        Self::new()
    }
}

impl MoneyField {
    /// Creates a field over `price_amount` / `price_currency`.
    pub fn new() -> Self {
        Self::with_columns("price_amount", "price_currency")
    }

    /// Creates a field over the given amount and currency columns.
    pub fn with_columns(
        amount_field: impl Into<String>,
        currency_field: impl Into<String>,
    ) -> Self {
        Self {
            field: NonDatabaseField::new()
                .describe("A field that represents an amount of money and the currency used"),
            amount_field: amount_field.into(),
            currency_field: currency_field.into(),
        }
    }

    /// Sets the verbose name.
    #[must_use]
    pub fn verbose_name(mut self, name: impl Into<String>) -> Self {
        self.field.verbose_name = Some(name.into());
        self
    }

    /// Registers the field on `meta` as a private field.
    #[must_use]
    pub fn contribute_to_class(mut self, meta: &mut ModelMeta, name: &str) -> Self {
        self.field.bind(meta, name);
        meta.add_private_field(self.field.clone());
        self
    }

    /// Reads the money value from `instance`.
    ///
    /// Returns the stored value when both columns are set, else the default.
    pub fn get<M: Model>(&self, instance: &M) -> CommonkitResult<Option<Money>> {
        let amount = instance.get_value(&self.amount_field).filter(|v| !v.is_null());
        let currency = instance.get_value(&self.currency_field).filter(|v| !v.is_null());
        match (amount, currency) {
            (Some(amount), Some(currency)) => Ok(Some(Money::new(
                to_decimal(&amount, &self.amount_field)?,
                currency.to_string(),
            ))),
            _ => self.get_default(M::meta()),
        }
    }

    /// Writes `value` into the amount and currency columns of `instance`.
    pub fn set<M: Model>(
        &self,
        instance: &mut M,
        value: impl Into<MoneyInput>,
    ) -> CommonkitResult<()> {
        let (amount, currency) = match value.into() {
            MoneyInput::Money(money) => (money.amount, Value::String(money.currency)),
            MoneyInput::Amount(amount) => {
                let currency = self
                    .concrete(M::meta(), &self.currency_field)?
                    .get_default()
                    .cloned()
                    .unwrap_or(Value::Null);
                (amount, currency)
            }
        };
        instance.set_value(&self.amount_field, Value::Decimal(amount));
        instance.set_value(&self.currency_field, currency);
        Ok(())
    }

    /// Builds the default value from the two columns' defaults.
    ///
    /// Returns `None` when the amount column declares no default.
    pub fn get_default(&self, meta: &ModelMeta) -> CommonkitResult<Option<Money>> {
        let currency = self.concrete(meta, &self.currency_field)?.get_default();
        let Some(amount) = self.concrete(meta, &self.amount_field)?.get_default() else {
            return Ok(None);
        };
        Ok(Some(Money::new(
            to_decimal(amount, &self.amount_field)?,
            currency.map(ToString::to_string).unwrap_or_default(),
        )))
    }

    fn concrete<'m>(
        &self,
        meta: &'m ModelMeta,
        name: &str,
    ) -> CommonkitResult<&'m crate::fields::FieldDef> {
        meta.get_field(name).ok_or_else(|| {
            CommonkitError::ImproperlyConfigured(format!(
                "{self} refers to field '{name}' which does not exist on {}",
                meta.label()
            ))
        })
    }
}

impl fmt::Display for MoneyField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MoneyField(amount_field={}, currency_field={})",
            self.amount_field, self.currency_field
        )
    }
}

fn to_decimal(value: &Value, column: &str) -> CommonkitResult<Decimal> {
    let invalid = || {
        CommonkitError::SerializationError(format!(
            "column '{column}' does not hold an amount: {value}"
        ))
    };
    match value {
        Value::Decimal(d) => Ok(*d),
        Value::Int(i) => Ok(Decimal::from(*i)),
        Value::Float(f) => Decimal::try_from(*f).map_err(|_| invalid()),
        Value::String(s) => Decimal::from_str(s).map_err(|_| invalid()),
        _ => Err(invalid()),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::OnceLock;

    use super::*;
    use crate::fields::{FieldDef, FieldType};

    #[derive(Default)]
    struct Product {
        values: HashMap<String, Value>,
    }

    impl Model for Product {
        fn meta() -> &'static ModelMeta {
            static META: OnceLock<ModelMeta> = OnceLock::new();
            META.get_or_init(|| {
                ModelMeta::new("shop", "product")
                    .field(FieldDef::new(
                        "price_amount",
                        FieldType::DecimalField {
                            max_digits: 10,
                            decimal_places: 2,
                        },
                    ))
                    .field(FieldDef::new("price_currency", FieldType::CharField).default("EUR"))
            })
        }

        fn get_value(&self, field: &str) -> Option<Value> {
            self.values.get(field).cloned()
        }

        fn set_value(&mut self, field: &str, value: Value) {
            self.values.insert(field.to_string(), value);
        }
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_get_returns_money_when_both_columns_set() {
        let mut p = Product::default();
        p.set_value("price_amount", Value::Decimal(dec("9.99")));
        p.set_value("price_currency", Value::from("USD"));
        let money = MoneyField::new().get(&p).unwrap().unwrap();
        assert_eq!(money, Money::new(dec("9.99"), "USD"));
    }

    #[test]
    fn test_get_without_amount_default_is_none() {
        let p = Product::default();
        assert_eq!(MoneyField::new().get(&p).unwrap(), None);
    }

    #[test]
    fn test_set_money_writes_its_currency() {
        let mut p = Product::default();
        let field = MoneyField::new();
        field.set(&mut p, Money::new(dec("12.50"), "GBP")).unwrap();
        assert_eq!(p.get_value("price_amount"), Some(Value::Decimal(dec("12.50"))));
        assert_eq!(p.get_value("price_currency"), Some(Value::from("GBP")));
    }

    #[test]
    fn test_set_bare_amount_uses_default_currency() {
        let mut p = Product::default();
        let field = MoneyField::new();
        field.set(&mut p, dec("3")).unwrap();
        assert_eq!(field.get(&p).unwrap(), Some(Money::new(dec("3"), "EUR")));
    }

    #[test]
    fn test_missing_column_is_improperly_configured() {
        let p = Product::default();
        let field = MoneyField::with_columns("cost", "price_currency");
        let err = field.get(&p).unwrap_err();
        assert!(matches!(err, CommonkitError::ImproperlyConfigured(_)));
    }

    #[test]
    fn test_contribute_registers_private_field() {
        let mut meta = ModelMeta::new("shop", "order");
        let field = MoneyField::new().contribute_to_class(&mut meta, "price");
        assert_eq!(field.field.name, "price");
        assert!(meta.get_private_field("price").is_some());
        assert!(meta.get_field("price").is_none());
    }
}
