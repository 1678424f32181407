use crate::{
    config::Config,
    product::{Product, ProductList, HEADERS},
};
use log::info;
use std::{
    error::Error,
    fmt::{self, Display, Formatter},
    fs::{self, File},
    io::BufReader,
    path::{Path, PathBuf},
};
use ErrorMessage::*;

#[derive(Debug)]
pub struct Inventory {
    pub list: ProductList,
    pub file_path: PathBuf,
}

#[derive(Debug)]
pub enum ErrorMessage {
    CouldNotRead,
    CouldNotWrite,
    InvalidHeader,
    InvalidRow,
}

#[derive(Debug)]
struct InventoryError {
    message: String,
}

impl ErrorMessage {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            CouldNotRead => "Could not read products file",
            CouldNotWrite => "Could not write products file",
            InvalidHeader => "Unexpected header",
            InvalidRow => "Invalid product row",
        }
    }
}

impl Display for ErrorMessage {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Display for InventoryError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "Inventory error: {}", self.message)
    }
}

impl Error for InventoryError {}

impl InventoryError {
    fn boxed(message: String) -> Box<dyn Error> {
        Box::new(InventoryError { message })
    }

    fn file(message: ErrorMessage, path: &Path, cause: impl Display) -> Box<dyn Error> {
        InventoryError::boxed(format!("{} '{}': {}", message, path.display(), cause))
    }
}

/// Reads the whole table into memory. The header must match [`HEADERS`]
/// exactly; duplicate ids are kept as they are.
pub fn read_products(path: &Path) -> Result<ProductList, Box<dyn Error>> {
    let file = File::open(path).map_err(|e| InventoryError::file(CouldNotRead, path, e))?;
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(BufReader::new(file));

    let headers = reader
        .headers()
        .map_err(|e| InventoryError::file(CouldNotRead, path, e))?
        .clone();
    if headers.iter().ne(HEADERS.iter().copied()) {
        let found = headers.iter().collect::<Vec<_>>().join(",");
        let details = format!("expected '{}', found '{}'", HEADERS.join(","), found);
        return Err(InventoryError::file(InvalidHeader, path, details));
    }

    let mut list = ProductList::new();
    for row in reader.deserialize::<Product>() {
        let product = row.map_err(|e| InventoryError::file(InvalidRow, path, e))?;
        list.add(product);
    }
    Ok(list)
}

/// Overwrites `path` with the header and every product in list order.
pub fn write_products(path: &Path, list: &ProductList) -> Result<(), Box<dyn Error>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| InventoryError::file(CouldNotWrite, path, e))?;
    }

    let mut writer =
        csv::Writer::from_path(path).map_err(|e| InventoryError::file(CouldNotWrite, path, e))?;
    // serialize() only emits the header alongside the first record
    if list.is_empty() {
        writer
            .write_record(HEADERS)
            .map_err(|e| InventoryError::file(CouldNotWrite, path, e))?;
    }
    for product in list.iter() {
        writer
            .serialize(product)
            .map_err(|e| InventoryError::file(CouldNotWrite, path, e))?;
    }
    writer
        .flush()
        .map_err(|e| InventoryError::file(CouldNotWrite, path, e))?;
    Ok(())
}

impl Inventory {
    pub fn load(file_path: impl Into<PathBuf>) -> Result<Self, Box<dyn Error>> {
        let file_path = file_path.into();
        info!("Reading products from file '{}'", file_path.display());
        let list = read_products(&file_path)?;
        info!("Loaded {} products", list.len());
        Ok(Inventory { list, file_path })
    }

    /// Loads the configured products file, first restoring it from the
    /// defaults when a reset was asked for or the file does not exist yet.
    pub fn open(config: &Config) -> Result<Self, Box<dyn Error>> {
        if config.reset {
            Inventory::reset_file(&config.products_path, &config.defaults_path)?;
        } else if !config.products_path.exists() && config.defaults_path.exists() {
            info!(
                "Seeding '{}' from '{}'",
                config.products_path.display(),
                config.defaults_path.display()
            );
            Inventory::reset_file(&config.products_path, &config.defaults_path)?;
        }
        Inventory::load(&config.products_path)
    }

    pub fn save(&self) -> Result<(), Box<dyn Error>> {
        write_products(&self.file_path, &self.list)?;
        info!(
            "Wrote {} products to '{}'",
            self.list.len(),
            self.file_path.display()
        );
        Ok(())
    }

    /// Swaps the in-memory list for the defaults; the file is untouched
    /// until the next save.
    pub fn reset(&mut self, defaults_path: &Path) -> Result<usize, Box<dyn Error>> {
        self.list = read_products(defaults_path)?;
        info!(
            "Restored {} products from '{}'",
            self.list.len(),
            defaults_path.display()
        );
        Ok(self.list.len())
    }

    pub fn reset_file(path: &Path, defaults_path: &Path) -> Result<usize, Box<dyn Error>> {
        let list = read_products(defaults_path)?;
        write_products(path, &list)?;
        info!(
            "Reset '{}' from '{}' ({} products)",
            path.display(),
            defaults_path.display(),
            list.len()
        );
        Ok(list.len())
    }
}
