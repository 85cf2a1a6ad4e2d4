//! CLI command implementations.

pub mod cart;
pub mod checkout;
pub mod config;
pub mod orders;

use clap::{Args, Subcommand};

/// Arguments for the cart command.
#[derive(Args)]
pub struct CartArgs {
    #[command(subcommand)]
    pub command: Option<CartCommand>,
}

#[derive(Subcommand)]
pub enum CartCommand {
    /// Show the cart (default).
    Show,
    /// Add a variant, summing with any existing line.
    Add {
        /// Variant ID.
        variant: String,
        /// Quantity to add.
        #[arg(short, long, default_value = "1")]
        quantity: u32,
    },
    /// Set the quantity of a variant; 0 removes it.
    Set {
        /// Variant ID.
        variant: String,
        /// Target quantity.
        quantity: u32,
    },
    /// Add one unit of a variant.
    Inc {
        /// Variant ID.
        variant: String,
    },
    /// Remove one unit of a variant.
    Dec {
        /// Variant ID.
        variant: String,
    },
    /// Remove a line item.
    Remove {
        /// Line item ID.
        line: String,
    },
    /// Forget the current cart.
    Clear {
        /// Skip confirmation prompt.
        #[arg(short, long)]
        yes: bool,
    },
    /// Apply or remove a discount code.
    Discount {
        #[command(subcommand)]
        command: CodeCommand,
    },
    /// Apply or remove a gift card.
    GiftCard {
        #[command(subcommand)]
        command: CodeCommand,
    },
    /// Set the customer email.
    Email {
        /// Email address.
        email: String,
    },
}

#[derive(Subcommand)]
pub enum CodeCommand {
    /// Apply a code.
    Add {
        /// Code as printed.
        code: String,
    },
    /// Remove a code.
    Remove {
        /// Code as applied.
        code: String,
    },
}

/// Arguments for the checkout command.
#[derive(Args)]
pub struct CheckoutArgs {
    #[command(subcommand)]
    pub command: Option<CheckoutCommand>,
}

#[derive(Subcommand)]
pub enum CheckoutCommand {
    /// Show the checkout stage and what is missing (default).
    Status,
    /// List shipping options for the cart.
    ShippingOptions,
    /// Choose a shipping option.
    Shipping {
        /// Shipping option ID.
        option: String,
    },
    /// Set the shipping address, and optionally a separate billing address.
    Address(AddressArgs),
    /// Choose a payment provider.
    Pay {
        /// Payment provider ID.
        provider: String,
    },
    /// Place the order.
    Complete {
        /// Skip confirmation prompt.
        #[arg(short, long)]
        yes: bool,
    },
}

/// Address fields. Billing fields default to the shipping ones.
#[derive(Args)]
pub struct AddressArgs {
    #[arg(long)]
    pub first_name: String,
    #[arg(long)]
    pub last_name: String,
    /// Street and number.
    #[arg(long)]
    pub address: String,
    #[arg(long)]
    pub city: String,
    #[arg(long)]
    pub postal_code: String,
    /// ISO 3166-1 alpha-2 country code.
    #[arg(long, default_value = "pl")]
    pub country: String,
    #[arg(long)]
    pub phone: Option<String>,

    /// Billing street and number, when billing differs from shipping.
    #[arg(long)]
    pub billing_address: Option<String>,
    #[arg(long, requires = "billing_address")]
    pub billing_city: Option<String>,
    #[arg(long, requires = "billing_address")]
    pub billing_postal_code: Option<String>,
    #[arg(long, requires = "billing_address")]
    pub billing_company: Option<String>,
}

/// Arguments for the orders command.
#[derive(Args)]
pub struct OrdersArgs {
    #[command(subcommand)]
    pub command: Option<OrdersCommand>,

    /// Customer auth token; stored for later runs.
    #[arg(long, env = "STOREFRONT_TOKEN", global = true, hide_env_values = true)]
    pub token: Option<String>,
}

#[derive(Subcommand)]
pub enum OrdersCommand {
    /// List orders, newest first (default).
    List {
        /// Page size.
        #[arg(short, long, default_value = "10")]
        limit: u32,
        /// Orders to skip.
        #[arg(long, default_value = "0")]
        offset: u32,
        /// Only orders with this status.
        #[arg(short, long)]
        status: Option<String>,
        /// Keep loading pages until every order is shown.
        #[arg(short, long)]
        all: bool,
    },
    /// Show one order.
    Show {
        /// Order ID.
        id: String,
    },
}

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration.
    Show,
    /// Get a config value.
    Get {
        /// Config key (dot-separated).
        key: String,
    },
    /// Set a config value.
    Set {
        /// Config key (dot-separated).
        key: String,
        /// Value to set.
        value: String,
    },
    /// Initialize a new config file.
    Init {
        /// Force overwrite existing config.
        #[arg(short, long)]
        force: bool,
    },
    /// Validate the config file.
    Validate,
}
