use {
    crate::{
        config::{Config, DEFAULT_DEFAULTS_PATH, DEFAULT_PRODUCTS_PATH, DEFAULT_USERNAME},
        inventory::Inventory,
        logger,
        product::{price, Field},
    },
    clap::{crate_name, ArgAction, Args, Parser, Subcommand},
    log::{debug, info, warn},
    std::{
        error::Error,
        fmt::{self, Display, Formatter},
        io::{stdin, stdout, BufRead, Write},
        path::PathBuf,
    },
    ErrorMessage::*,
};

const FIRST_PROMPT: &str = "Please enter your desired operation: ";
const INVALID_PROMPT: &str = "Please enter a valid operation: ";
const NEXT_PROMPT: &str = "Please enter another operation or enter Finish to commit changes: ";

#[derive(Parser, Debug)]
struct Repl {
    #[clap(subcommand)]
    cmd: Commands,
}

/// Interactive inventory manager over a CSV products table.
///
/// Without a command, starts the operation menu; changes are written back
/// on Finish. With a command, runs it once and saves if it changed anything.
#[derive(Parser, Debug)]
#[command(version)]
pub struct Cli {
    /// Products table to load and save
    #[arg(short, long, default_value = DEFAULT_PRODUCTS_PATH)]
    pub file: PathBuf,
    /// Table restored by `reset` and used to seed a missing products file
    #[arg(long, default_value = DEFAULT_DEFAULTS_PATH)]
    pub defaults: PathBuf,
    /// Operator name shown in the menu
    #[arg(short, long, default_value = DEFAULT_USERNAME)]
    pub user: String,
    /// Restore the products file from the defaults before loading it
    #[arg(long)]
    pub reset: bool,
    /// Log more (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
    /// Disable logging
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
    #[clap(subcommand)]
    cmd: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Display a list of product identifiers and names
    List,
    /// Show information about a product
    Show {
        id: Option<u64>,
        /// Print the product as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add a new product
    Create(FieldArgs),
    /// Edit an existing product
    Update {
        id: Option<u64>,
        #[command(flatten)]
        fields: FieldArgs,
    },
    /// Delete an existing product
    Destroy { id: Option<u64> },
    /// Restore the default product list
    Reset,
    /// Show the menu again
    Menu,
    /// Save changes and exit
    Finish,
    /// Exit without saving
    Exit,
}

#[derive(Debug, Args)]
struct FieldArgs {
    #[arg(short, long)]
    name: Option<String>,
    #[arg(short, long)]
    aisle: Option<String>,
    #[arg(short, long)]
    department: Option<String>,
    #[arg(short, long)]
    price: Option<String>,
}

impl FieldArgs {
    fn into_changes(self) -> Vec<(Field, String)> {
        [
            (Field::Name, self.name),
            (Field::Aisle, self.aisle),
            (Field::Department, self.department),
            (Field::Price, self.price),
        ]
        .into_iter()
        .filter_map(|(field, value)| value.map(|value| (field, value)))
        .collect()
    }
}

/// What the loop does after an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// Write the table and stop
    Commit,
    /// Stop without writing
    Discard,
}

#[derive(Debug)]
pub enum ErrorMessage {
    InvalidId,
    UnmatchedQuote,
    EndOfInput,
    InteractiveModeOnly,
}

impl ErrorMessage {
    pub(crate) fn as_str(&self) -> &'static str {
        match *self {
            InvalidId => "Invalid ID",
            UnmatchedQuote => "Unmatched quote",
            EndOfInput => "Unexpected end of input",
            InteractiveModeOnly => "This command can only be used in interactive mode",
        }
    }
}

impl Display for ErrorMessage {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug)]
struct ReplError {
    message: String,
}

impl Display for ReplError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "REPL Error: {}", self.message)
    }
}

impl Error for ReplError {}

impl ReplError {
    pub fn boxed(message: String) -> Box<dyn Error> {
        Box::new(ReplError { message })
    }

    pub fn base(message: ErrorMessage) -> Box<dyn Error> {
        ReplError::boxed(format!("{}", message))
    }

    pub fn with(message: ErrorMessage, details: &str) -> Box<dyn Error> {
        ReplError::boxed(format!("{}: '{}'", message, details))
    }
}

pub fn menu(username: &str, products_count: usize) -> String {
    format!(
        "\
-----------------------------------
INVENTORY MANAGEMENT APPLICATION
-----------------------------------
Welcome {username}!
There are {products_count} products in the database.
    operation | description
    --------- | ------------------
    'List'    | Display a list of product identifiers and names.
    'Show'    | Show information about a product.
    'Create'  | Add a new product.
    'Update'  | Edit an existing product.
    'Destroy' | Delete an existing product.
    'Reset'   | Restore the default product list.
    'Menu'    | Show this menu again.
    'Finish'  | Save changes and exit.
    'Exit'    | Exit without saving."
    )
}

pub(crate) struct Parsing;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Quote {
    Unquoted,
    Single,
    Double,
}

impl Parsing {
    pub(crate) fn id(answer: &str) -> Result<u64, Box<dyn Error>> {
        answer
            .trim()
            .parse::<u64>()
            .map_err(|_| ReplError::with(InvalidId, answer.trim()))
    }

    /// Splits on whitespace; single or double quotes keep words together.
    pub(crate) fn split_line(line: &str) -> Result<Vec<String>, Box<dyn Error>> {
        let mut words = Vec::new();
        let mut word = String::new();
        let mut in_word = false;
        let mut quote = Quote::Unquoted;

        for ch in line.chars() {
            match (quote, ch) {
                (Quote::Unquoted, c) if c.is_whitespace() => {
                    if in_word {
                        words.push(std::mem::take(&mut word));
                        in_word = false;
                    }
                }
                (Quote::Unquoted, '\'') => {
                    quote = Quote::Single;
                    in_word = true;
                }
                (Quote::Unquoted, '"') => {
                    quote = Quote::Double;
                    in_word = true;
                }
                (Quote::Single, '\'') | (Quote::Double, '"') => quote = Quote::Unquoted,
                (_, c) => {
                    word.push(c);
                    in_word = true;
                }
            }
        }

        if quote != Quote::Unquoted {
            return Err(ReplError::base(UnmatchedQuote));
        }
        if in_word {
            words.push(word);
        }
        Ok(words)
    }

    /// Operation names are case-insensitive, so `List` and `list` both work.
    fn command_args(line: &str) -> Result<Vec<String>, Box<dyn Error>> {
        let mut words = Parsing::split_line(line)?;
        if let Some(first) = words.first_mut() {
            *first = first.to_lowercase();
        }
        let mut args = vec![crate_name!().to_string()];
        args.extend(words);
        Ok(args)
    }
}

struct Prompt<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompt<R, W> {
    /// `None` once the input is exhausted.
    fn readline(&mut self, message: &str) -> Result<Option<String>, Box<dyn Error>> {
        write!(self.output, "{}", message)?;
        self.output.flush()?;
        let mut buffer = String::new();
        match self.input.read_line(&mut buffer)? {
            0 => Ok(None),
            _ => Ok(Some(buffer.trim().to_string())),
        }
    }

    fn line(&mut self, message: &str) -> Result<String, Box<dyn Error>> {
        self.readline(message)?
            .ok_or_else(|| ReplError::base(EndOfInput))
    }

    fn id(&mut self, action: &str) -> Result<u64, Box<dyn Error>> {
        let answer = self.line(&format!("Please enter an item ID to {}: ", action))?;
        Parsing::id(&answer)
    }

    fn field(&mut self, given: Option<String>, field: Field) -> Result<String, Box<dyn Error>> {
        match given {
            Some(value) => Ok(value),
            None => self.line(&format!("Please enter the new products {}: ", field)),
        }
    }

    fn confirm(&mut self, question: &str) -> Result<bool, Box<dyn Error>> {
        loop {
            let answer = self.line(&format!("{} (y/n) ", question))?;
            match answer.to_lowercase().as_str() {
                "y" | "yes" => return Ok(true),
                "n" | "no" => return Ok(false),
                _ => continue,
            }
        }
    }

    fn say(&mut self, text: impl Display) -> Result<(), Box<dyn Error>> {
        writeln!(self.output, "{}", text)?;
        Ok(())
    }
}

/// One load-edit-save cycle over an [`Inventory`].
pub struct Session<R, W> {
    prompt: Prompt<R, W>,
    inventory: Inventory,
    config: Config,
    dirty: bool,
}

impl<R: BufRead, W: Write> Session<R, W> {
    pub fn new(input: R, output: W, inventory: Inventory, config: Config) -> Self {
        Session {
            prompt: Prompt { input, output },
            inventory,
            config,
            dirty: false,
        }
    }

    #[cfg(test)]
    pub fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    #[cfg(test)]
    pub fn output(&self) -> &W {
        &self.prompt.output
    }

    /// Runs the menu until Finish, Exit or end of input. The table is only
    /// written on Finish.
    pub fn run_loop(&mut self) -> Result<Flow, Box<dyn Error>> {
        self.print_menu()?;
        let mut message = FIRST_PROMPT;

        loop {
            let line = match self.prompt.readline(message)? {
                Some(line) => line,
                None => {
                    self.prompt.say("")?;
                    if self.dirty {
                        warn!("Input closed, discarding unsaved changes");
                    }
                    return Ok(Flow::Discard);
                }
            };
            if line.is_empty() {
                continue;
            }

            let cmd = match Parsing::command_args(&line) {
                Ok(args) => match Repl::try_parse_from(args) {
                    Ok(repl) => repl.cmd,
                    Err(e) => {
                        self.prompt.say(e.to_string().trim_end())?;
                        message = if e.use_stderr() { INVALID_PROMPT } else { NEXT_PROMPT };
                        continue;
                    }
                },
                Err(e) => {
                    self.prompt.say(e)?;
                    message = INVALID_PROMPT;
                    continue;
                }
            };

            match self.resolve_cmd(cmd) {
                Ok(Flow::Continue) => {}
                Ok(Flow::Commit) => {
                    self.commit()?;
                    return Ok(Flow::Commit);
                }
                Ok(Flow::Discard) => {
                    if self.dirty {
                        warn!("Exiting without saving changes");
                    }
                    return Ok(Flow::Discard);
                }
                Err(e) => self.prompt.say(e)?,
            }
            message = NEXT_PROMPT;
        }
    }

    fn run_once(&mut self, cmd: Commands) -> Result<(), Box<dyn Error>> {
        use Commands::*;
        match cmd {
            Menu | Finish | Exit => Err(ReplError::base(InteractiveModeOnly)),
            _ => {
                self.resolve_cmd(cmd)?;
                if self.dirty {
                    self.commit()?;
                }
                Ok(())
            }
        }
    }

    fn commit(&mut self) -> Result<(), Box<dyn Error>> {
        self.inventory.save()?;
        self.dirty = false;
        let path = self.inventory.file_path.display().to_string();
        self.prompt
            .say(format!("Saved {} products to '{}'", self.inventory.list.len(), path))
    }

    fn resolve_cmd(&mut self, cmd: Commands) -> Result<Flow, Box<dyn Error>> {
        use Commands::*;
        debug!("Resolving {:?}", cmd);
        match cmd {
            List => self.list_products()?,
            Show { id, json } => {
                let id = match id {
                    Some(id) => id,
                    None => self.prompt.id("show")?,
                };
                self.show_product(id, json)?;
            }
            Create(fields) => self.create_product(fields)?,
            Update { id, fields } => self.update_product(id, fields)?,
            Destroy { id } => {
                let id = match id {
                    Some(id) => id,
                    None => self.prompt.id("delete")?,
                };
                self.destroy_product(id)?;
            }
            Reset => {
                let count = self.inventory.reset(&self.config.defaults_path)?;
                self.dirty = true;
                self.prompt.say(format!("Restored {} default products", count))?;
            }
            Menu => self.print_menu()?,
            Finish => return Ok(Flow::Commit),
            Exit => return self.confirm_exit(),
        }
        Ok(Flow::Continue)
    }

    fn print_menu(&mut self) -> Result<(), Box<dyn Error>> {
        let text = menu(&self.config.username, self.inventory.list.len());
        self.prompt.say(text)
    }

    fn list_products(&mut self) -> Result<(), Box<dyn Error>> {
        if self.inventory.list.is_empty() {
            return self.prompt.say("There are no products.");
        }
        for product in self.inventory.list.iter() {
            writeln!(self.prompt.output, " + {} {}", product.id, product.name)?;
        }
        Ok(())
    }

    fn show_product(&mut self, id: u64, json: bool) -> Result<(), Box<dyn Error>> {
        let product = self.inventory.list.find(id)?;
        if json {
            writeln!(self.prompt.output, "{}", serde_json::to_string_pretty(product)?)?;
        } else {
            writeln!(self.prompt.output, "{}", product)?;
        }
        Ok(())
    }

    fn create_product(&mut self, fields: FieldArgs) -> Result<(), Box<dyn Error>> {
        let name = self.prompt.field(fields.name, Field::Name)?;
        let aisle = self.prompt.field(fields.aisle, Field::Aisle)?;
        let department = self.prompt.field(fields.department, Field::Department)?;
        let price = price::parse(&self.prompt.field(fields.price, Field::Price)?)?;

        let id = self.inventory.list.create(&name, &aisle, &department, price)?;
        self.dirty = true;
        let created = self.inventory.list.find(id)?;
        writeln!(self.prompt.output, "Created {}", created)?;
        Ok(())
    }

    /// Inline fields are applied as given; otherwise every editable field is
    /// prompted for and a blank answer keeps the current value. Nothing is
    /// stored unless all answers are valid.
    fn update_product(&mut self, id: Option<u64>, fields: FieldArgs) -> Result<(), Box<dyn Error>> {
        let id = match id {
            Some(id) => id,
            None => {
                self.list_products()?;
                self.prompt.id("update")?
            }
        };
        let mut product = self.inventory.list.find(id)?.clone();
        self.prompt.say(&product)?;

        let changes = fields.into_changes();
        if changes.is_empty() {
            self.prompt.say("Please provide the products information")?;
            for field in Field::EDITABLE {
                let question = format!("Change '{}' from '{}' to: ", field, product.field(field));
                let answer = self.prompt.line(&question)?;
                if !answer.is_empty() {
                    product.set_field(field, &answer)?;
                }
            }
        } else {
            for (field, value) in changes {
                product.set_field(field, &value)?;
            }
        }

        self.prompt.say(format!("Updating product: {}", product))?;
        self.inventory.list.replace(product)?;
        self.dirty = true;
        Ok(())
    }

    fn destroy_product(&mut self, id: u64) -> Result<(), Box<dyn Error>> {
        let product = self.inventory.list.remove_by_id(id)?;
        self.dirty = true;
        self.prompt.say(format!("this will be deleted: {}", product))
    }

    fn confirm_exit(&mut self) -> Result<Flow, Box<dyn Error>> {
        if !self.dirty {
            return Ok(Flow::Discard);
        }
        match self.prompt.confirm("Discard unsaved changes?")? {
            true => Ok(Flow::Discard),
            false => Ok(Flow::Continue),
        }
    }
}

/// Opens the configured inventory and either runs the single command given
/// on the command line or the interactive menu.
pub fn execute<R: BufRead, W: Write>(
    cli: Cli,
    config: Config,
    input: R,
    output: W,
) -> Result<(), Box<dyn Error>> {
    let inventory = Inventory::open(&config)?;
    let mut session = Session::new(input, output, inventory, config);

    match cli.cmd {
        Some(cmd) => session.run_once(cmd),
        None => {
            let flow = session.run_loop()?;
            info!("Session ended: {:?}", flow);
            Ok(())
        }
    }
}

pub fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let config = Config::from_cli(&cli);
    logger::init(config.log_level)?;
    let stdin = stdin();
    execute(cli, config, stdin.lock(), stdout())
}
