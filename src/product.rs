use log::info;
use serde::{Deserialize, Serialize};
use std::{
    error::Error,
    fmt::{self, Display, Formatter},
};
use ErrorMessage::*;

/// Column order of the products table.
pub const HEADERS: [&str; 5] = ["id", "name", "aisle", "department", "price"];

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Product {
    pub id: u64,
    pub name: String,
    pub aisle: String,
    pub department: String,
    /// Price in cents.
    #[serde(with = "price")]
    pub price: u64,
}

/// The operator-editable columns, in prompt order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Name,
    Aisle,
    Department,
    Price,
}

#[derive(Debug, Default)]
pub struct ProductList {
    products: Vec<Product>,
}

impl Display for Product {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(
            f,
            "Product: {}\n ID: {}, Aisle: {}, Department: {}, Price: ${}",
            self.name,
            self.id,
            self.aisle,
            self.department,
            price::format(self.price),
        )
    }
}

impl Field {
    pub const EDITABLE: [Field; 4] = [Field::Name, Field::Aisle, Field::Department, Field::Price];

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::Aisle => "aisle",
            Field::Department => "department",
            Field::Price => "price",
        }
    }
}

impl Display for Field {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug)]
pub struct ProductError {
    pub level: String,
    pub message: String,
}

impl Display for ProductError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{} Error: {}", self.level, self.message)
    }
}

impl Error for ProductError {}

impl ProductError {
    pub fn boxed(level: &str, message: String) -> Box<dyn Error> {
        Box::new(ProductError {
            level: level.to_string(),
            message,
        })
    }

    pub fn product(message: String) -> Box<dyn Error> {
        ProductError::boxed("Product", message)
    }

    pub fn list(message: String) -> Box<dyn Error> {
        ProductError::boxed("List", message)
    }

    pub fn message(error: ErrorMessage, details: Option<String>) -> String {
        if let Some(details) = details {
            format!("{}: {}", error, details)
        } else {
            format!("{}", error)
        }
    }
}

#[derive(Debug, PartialEq)]
pub enum ErrorMessage {
    ProductNotFound,
    InvalidPrice,
    IdExhausted,
}

impl ErrorMessage {
    pub fn as_str(&self) -> &str {
        match self {
            ProductNotFound => "Product not found",
            InvalidPrice => "Invalid price",
            IdExhausted => "No product id left above the highest one in use",
        }
    }
}

impl Display for ErrorMessage {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Prices travel as two-decimal strings and live as cents.
pub mod price {
    use super::{ErrorMessage::InvalidPrice, ProductError};
    use serde::{de, Deserialize, Deserializer, Serializer};
    use std::error::Error;

    pub fn format(cents: u64) -> String {
        format!("{}.{:02}", cents / 100, cents % 100)
    }

    /// Accepts `4.99`, `4,99`, `$4.99` and whole numbers. Digits past the
    /// cents are rounded half up.
    pub fn parse(input: &str) -> Result<u64, Box<dyn Error>> {
        let trimmed = input.trim();
        let normalized = trimmed.trim_start_matches('$').replace(',', ".");

        cents(&normalized).ok_or_else(|| {
            let message = ProductError::message(InvalidPrice, Some(format!("'{}'", trimmed)));
            ProductError::product(message)
        })
    }

    fn cents(number: &str) -> Option<u64> {
        let (whole, fraction) = number.split_once('.').unwrap_or((number, ""));
        let is_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
        if (whole.is_empty() && fraction.is_empty()) || !is_digits(whole) || !is_digits(fraction) {
            return None;
        }

        let digit = |i: usize| fraction.as_bytes().get(i).map_or(0, |b| u64::from(b - b'0'));
        let whole = match whole {
            "" => 0,
            digits => digits.parse::<u64>().ok()?,
        };
        let round_up = u64::from(digit(2) >= 5);

        whole
            .checked_mul(100)?
            .checked_add(digit(0) * 10 + digit(1))?
            .checked_add(round_up)
    }

    pub fn serialize<S: Serializer>(cents: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(*cents))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(|e| de::Error::custom(e.to_string()))
    }
}

impl Product {
    pub fn new(id: u64, name: &str, aisle: &str, department: &str, price: u64) -> Self {
        Product {
            id,
            name: name.to_string(),
            aisle: aisle.to_string(),
            department: department.to_string(),
            price,
        }
    }

    /// Current value of `field` as the operator would type it.
    pub fn field(&self, field: Field) -> String {
        match field {
            Field::Name => self.name.clone(),
            Field::Aisle => self.aisle.clone(),
            Field::Department => self.department.clone(),
            Field::Price => price::format(self.price),
        }
    }

    pub fn set_field(&mut self, field: Field, value: &str) -> Result<(), Box<dyn Error>> {
        match field {
            Field::Name => self.name = value.to_string(),
            Field::Aisle => self.aisle = value.to_string(),
            Field::Department => self.department = value.to_string(),
            Field::Price => self.price = price::parse(value)?,
        }
        Ok(())
    }
}

impl ProductList {
    pub fn new() -> Self {
        ProductList {
            products: Vec::new(),
        }
    }

    /// One past the highest id in the list, so ids freed by a removal at the
    /// tail are handed out again.
    pub fn next_id(&self) -> Result<u64, Box<dyn Error>> {
        match self.products.iter().map(|p| p.id).max() {
            None => Ok(1),
            Some(highest) => highest.checked_add(1).ok_or_else(|| {
                let message = ProductError::message(IdExhausted, Some(format!("- {}", highest)));
                ProductError::list(message)
            }),
        }
    }

    /// Appends as-is; ids read from a file are trusted.
    pub fn add(&mut self, product: Product) {
        self.products.push(product);
    }

    pub fn create(
        &mut self,
        name: &str,
        aisle: &str,
        department: &str,
        price: u64,
    ) -> Result<u64, Box<dyn Error>> {
        let id = self.next_id()?;
        self.products
            .push(Product::new(id, name, aisle, department, price));
        info!("Product {} created", id);
        Ok(id)
    }

    pub fn remove_by_id(&mut self, id: u64) -> Result<Product, Box<dyn Error>> {
        match self.products.iter().position(|p| p.id == id) {
            Some(index) => {
                let product = self.products.remove(index);
                info!("Product {} removed", id);
                Ok(product)
            }
            None => {
                let message = ProductError::message(ProductNotFound, Some(format!("- {}", id)));
                Err(ProductError::list(message))
            }
        }
    }

    pub fn product(&self, id: u64) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }

    pub fn product_mut(&mut self, id: u64) -> Option<&mut Product> {
        self.products.iter_mut().find(|p| p.id == id)
    }

    /// Like [`ProductList::product`], but a missing id is an error.
    pub fn find(&self, id: u64) -> Result<&Product, Box<dyn Error>> {
        self.product(id).ok_or_else(|| {
            let message = ProductError::message(ProductNotFound, Some(format!("- {}", id)));
            ProductError::list(message)
        })
    }

    pub fn replace(&mut self, product: Product) -> Result<(), Box<dyn Error>> {
        let id = product.id;
        match self.product_mut(id) {
            Some(current) => {
                *current = product;
                info!("Product {} updated", id);
                Ok(())
            }
            None => {
                let message = ProductError::message(ProductNotFound, Some(format!("- {}", id)));
                Err(ProductError::list(message))
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Product> {
        self.products.iter()
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}
