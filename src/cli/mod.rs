use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use uuid::Uuid;

use crate::application::InventoryService;
use crate::config::Settings;
use crate::domain::{
    format_cents, parse_cents, HistoryFilter, MovementKind, NewProduct, ProductSpecs,
    ProductUpdate, ProfileId,
};

/// Stockroom - Inventory Stock Ledger
#[derive(Parser)]
#[command(name = "stockroom")]
#[command(about = "Track product stock through an append-only ledger of inbound and outbound movements")]
#[command(version)]
pub struct Cli {
    /// Database file path (overrides the configured one)
    #[arg(short, long, global = true)]
    pub database: Option<String>,

    /// Settings file (defaults to ./stockroom.toml when present)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Profile ID performing the operation (overrides STOCKROOM_USER)
    #[arg(short, long, global = true)]
    pub user: Option<Uuid>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Profile management commands
    #[command(subcommand)]
    Profile(ProfileCommands),

    /// Product catalogue commands
    #[command(subcommand)]
    Product(ProductCommands),

    /// Record an inbound movement (stock received)
    In {
        /// Product name or ID
        product: String,

        /// Units received
        quantity: i64,

        /// Free-text note
        #[arg(short, long)]
        note: Option<String>,
    },

    /// Record an outbound movement (stock issued)
    Out {
        /// Product name or ID
        product: String,

        /// Units issued
        quantity: i64,

        /// Free-text note
        #[arg(short, long)]
        note: Option<String>,
    },

    /// Show the current balance of a product
    Balance {
        /// Product name or ID
        product: String,
    },

    /// List products at or below their minimum stock
    LowStock {
        /// Maximum number of products to show
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// List movements, newest first
    History {
        /// Match product or responsible name
        #[arg(short, long)]
        search: Option<String>,

        /// Movement type: entrada, saida, inbound, outbound
        #[arg(short = 't', long = "type")]
        kind: Option<MovementKind>,

        /// Maximum number of movements to show
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Show stock totals, low stock and recent activity
    Dashboard,

    /// Verify that every balance matches its movement log
    Check,

    /// Export data to CSV or JSON
    Export {
        /// What to export: products, movements, full
        export_type: String,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum ProfileCommands {
    /// Create a new profile
    Signup {
        /// Full display name
        full_name: String,
    },

    /// Show a profile (the configured user if no ID is given)
    Show {
        /// Profile ID
        id: Option<Uuid>,
    },

    /// List all profiles
    List,

    /// Change the configured user's display name
    Rename {
        /// New full name
        full_name: String,
    },
}

#[derive(Subcommand)]
pub enum ProductCommands {
    /// Register a new product
    Add {
        /// Product name
        name: String,

        #[arg(short, long)]
        category: String,

        #[arg(short, long, default_value = "")]
        brand: String,

        #[arg(short, long, default_value = "")]
        model: String,

        /// Starting stock
        #[arg(short, long, default_value = "0")]
        quantity: i64,

        /// Low-stock threshold
        #[arg(long, default_value = "0")]
        min_stock: i64,

        /// Unit price (e.g., "1299.90" or "1299,90")
        #[arg(short, long, default_value = "0")]
        price: String,

        #[command(flatten)]
        specs: SpecArgs,
    },

    /// Edit a product's details (stock is changed only through movements)
    Edit {
        /// Product name or ID
        product: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(short, long)]
        category: Option<String>,

        #[arg(short, long)]
        brand: Option<String>,

        #[arg(short, long)]
        model: Option<String>,

        #[arg(long)]
        min_stock: Option<i64>,

        #[arg(short, long)]
        price: Option<String>,

        #[command(flatten)]
        specs: SpecArgs,
    },

    /// List products
    List {
        /// Match name, category, brand or model
        #[arg(short, long)]
        search: Option<String>,
    },

    /// Show detailed product information
    Show {
        /// Product name or ID
        product: String,
    },

    /// Delete a product and its movement history
    Delete {
        /// Product name or ID
        product: String,
    },
}

/// Technical attributes. On edit, an empty value clears the attribute.
#[derive(Args)]
pub struct SpecArgs {
    #[arg(long)]
    voltage: Option<String>,

    #[arg(long)]
    dimensions: Option<String>,

    #[arg(long)]
    resolution: Option<String>,

    #[arg(long)]
    storage: Option<String>,

    #[arg(long)]
    connectivity: Option<String>,
}

impl Cli {
    fn settings(&self) -> Result<Settings> {
        let mut settings =
            Settings::load(self.config.as_deref()).context("Failed to load settings")?;
        if let Some(database) = &self.database {
            settings.database = database.clone();
        }
        if let Some(user) = self.user {
            settings.user = Some(user);
        }
        Ok(settings)
    }

    pub async fn run(self) -> Result<()> {
        let settings = self.settings()?;

        if matches!(self.command, Commands::Init) {
            InventoryService::init(&settings).await?;
            println!("Database initialized: {}", settings.database);
            return Ok(());
        }

        let service = InventoryService::connect(&settings)
            .await
            .with_context(|| format!("Cannot open {}. Run 'stockroom init' first", settings.database))?;

        match self.command {
            // Handled before connecting.
            Commands::Init => {}

            Commands::Profile(cmd) => run_profile_command(&service, &settings, cmd).await?,

            Commands::Product(cmd) => run_product_command(&service, &settings, cmd).await?,

            Commands::In {
                product,
                quantity,
                note,
            } => {
                run_movement_command(&service, &settings, MovementKind::Inbound, &product, quantity, note)
                    .await?
            }

            Commands::Out {
                product,
                quantity,
                note,
            } => {
                run_movement_command(&service, &settings, MovementKind::Outbound, &product, quantity, note)
                    .await?
            }

            Commands::Balance { product } => {
                let product = service.find_product(&product).await?;
                let entry = service.balance(product.id).await?;
                println!(
                    "{}: {} (minimum {}){}",
                    entry.product_name,
                    entry.quantity,
                    entry.min_stock,
                    if entry.is_low_stock() { "  LOW" } else { "" }
                );
            }

            Commands::LowStock { limit } => {
                let limit = limit.unwrap_or(settings.low_stock_limit);
                run_low_stock_command(&service, limit).await?;
            }

            Commands::History {
                search,
                kind,
                limit,
            } => {
                let mut filter = HistoryFilter::new();
                if let Some(term) = search {
                    filter = filter.with_search(term);
                }
                if let Some(kind) = kind {
                    filter = filter.with_kind(kind);
                }
                run_history_command(&service, &filter, limit).await?;
            }

            Commands::Dashboard => run_dashboard_command(&service, &settings).await?,

            Commands::Check => run_check_command(&service).await?,

            Commands::Export {
                export_type,
                output,
            } => run_export_command(&service, &export_type, output.as_deref()).await?,
        }

        Ok(())
    }
}

/// The profile mutating commands act as.
fn actor(settings: &Settings) -> Result<ProfileId> {
    settings.user.context(
        "No user configured. Pass --user <PROFILE_ID> or set STOCKROOM_USER (see 'stockroom profile signup')",
    )
}

async fn run_profile_command(
    service: &InventoryService,
    settings: &Settings,
    cmd: ProfileCommands,
) -> Result<()> {
    match cmd {
        ProfileCommands::Signup { full_name } => {
            let profile = service.signup(&full_name).await?;
            println!("Created profile: {} ({})", profile.full_name, profile.id);
            println!("Act as this profile with: export STOCKROOM_USER={}", profile.id);
        }

        ProfileCommands::Show { id } => {
            let id = match id {
                Some(id) => id,
                None => actor(settings)?,
            };
            let profile = service.get_profile(id).await?;
            println!("Profile: {}", profile.full_name);
            println!("  ID:      {}", profile.id);
            println!(
                "  Created: {}",
                profile.created_at.format("%Y-%m-%d %H:%M:%S")
            );
            println!(
                "  Updated: {}",
                profile.updated_at.format("%Y-%m-%d %H:%M:%S")
            );
        }

        ProfileCommands::List => {
            let profiles = service.list_profiles().await?;
            if profiles.is_empty() {
                println!("No profiles found.");
            } else {
                println!("{:<36}  NAME", "ID");
                println!("{}", "-".repeat(60));
                for profile in profiles {
                    println!("{:<36}  {}", profile.id, profile.full_name);
                }
            }
        }

        ProfileCommands::Rename { full_name } => {
            let profile = service.rename_profile(actor(settings)?, &full_name).await?;
            println!("Renamed profile to: {}", profile.full_name);
        }
    }
    Ok(())
}

async fn run_product_command(
    service: &InventoryService,
    settings: &Settings,
    cmd: ProductCommands,
) -> Result<()> {
    match cmd {
        ProductCommands::Add {
            name,
            category,
            brand,
            model,
            quantity,
            min_stock,
            price,
            specs,
        } => {
            let price_cents =
                parse_cents(&price).context("Invalid price format. Use '1299.90' or '1299'")?;
            let input = NewProduct {
                name,
                category,
                brand,
                model,
                quantity,
                min_stock,
                price_cents,
                specs: ProductSpecs {
                    voltage: non_blank(specs.voltage),
                    dimensions: non_blank(specs.dimensions),
                    screen_resolution: non_blank(specs.resolution),
                    storage_capacity: non_blank(specs.storage),
                    connectivity: non_blank(specs.connectivity),
                },
            };

            let product = service.register_product(actor(settings)?, input).await?;
            println!(
                "Registered product: {} ({} units, {})",
                product.name, product.quantity, product.id
            );
        }

        ProductCommands::Edit {
            product,
            name,
            category,
            brand,
            model,
            min_stock,
            price,
            specs,
        } => {
            let price_cents = price
                .map(|p| parse_cents(&p))
                .transpose()
                .context("Invalid price format. Use '1299.90' or '1299'")?;
            let update = ProductUpdate {
                name,
                category,
                brand,
                model,
                min_stock,
                price_cents,
                voltage: specs.voltage,
                dimensions: specs.dimensions,
                screen_resolution: specs.resolution,
                storage_capacity: specs.storage,
                connectivity: specs.connectivity,
            };

            let actor = actor(settings)?;
            let target = service.find_product(&product).await?;
            let product = service.update_product(actor, target.id, update).await?;
            println!("Updated product: {} ({})", product.name, product.id);
        }

        ProductCommands::List { search } => {
            let products = service.list_products(search.as_deref()).await?;
            if products.is_empty() {
                println!("No products found.");
            } else {
                println!(
                    "{:<25} {:<15} {:<15} {:>8} {:>8} {:>12}",
                    "NAME", "CATEGORY", "BRAND", "QTY", "MIN", "PRICE"
                );
                println!("{}", "-".repeat(88));
                for product in products {
                    println!(
                        "{:<25} {:<15} {:<15} {:>8} {:>8} {:>12}{}",
                        truncate(&product.name, 25),
                        truncate(&product.category, 15),
                        truncate(&product.brand, 15),
                        product.quantity,
                        product.min_stock,
                        format_cents(product.price_cents),
                        if product.is_low_stock() { "  LOW" } else { "" }
                    );
                }
            }
        }

        ProductCommands::Show { product } => {
            let product = service.find_product(&product).await?;
            run_product_show_command(service, product.id).await?;
        }

        ProductCommands::Delete { product } => {
            let actor = actor(settings)?;
            let target = service.find_product(&product).await?;
            let product = service.delete_product(actor, target.id).await?;
            println!("Deleted product: {} ({})", product.name, product.id);
        }
    }
    Ok(())
}

async fn run_product_show_command(service: &InventoryService, id: Uuid) -> Result<()> {
    let info = service.get_product_info(id).await?;
    let product = &info.product;

    println!("Product: {}", product.name);
    println!("  ID:          {}", product.id);
    println!("  Category:    {}", product.category);
    if !product.brand.is_empty() {
        println!("  Brand:       {}", product.brand);
    }
    if !product.model.is_empty() {
        println!("  Model:       {}", product.model);
    }
    println!("  Price:       {}", format_cents(product.price_cents));

    let specs = [
        ("Voltage", &product.specs.voltage),
        ("Dimensions", &product.specs.dimensions),
        ("Resolution", &product.specs.screen_resolution),
        ("Storage", &product.specs.storage_capacity),
        ("Connectivity", &product.specs.connectivity),
    ];
    for (label, value) in specs {
        if let Some(value) = value {
            println!("  {:<12} {}", format!("{}:", label), value);
        }
    }

    println!(
        "  Created:     {}",
        product.created_at.format("%Y-%m-%d %H:%M:%S")
    );
    if let Some(profile) = &info.created_by {
        println!("  Created by:  {}", profile.full_name);
    }
    println!();
    println!(
        "  Stock:       {} (minimum {}){}",
        product.quantity,
        product.min_stock,
        if product.is_low_stock() { "  LOW" } else { "" }
    );
    println!("  Value:       {}", format_cents(product.stock_value()));
    println!(
        "  Movements:   {} (started at {})",
        info.movement_count, product.initial_quantity
    );

    if !info.recent_movements.is_empty() {
        println!();
        println!("  Recent movements:");
        for movement in &info.recent_movements {
            println!(
                "    {}  {:<8} {:>6}  {}",
                movement.created_at.format("%Y-%m-%d %H:%M"),
                movement.kind.label(),
                movement.quantity,
                movement.responsible_name
            );
        }
    }

    Ok(())
}

async fn run_movement_command(
    service: &InventoryService,
    settings: &Settings,
    kind: MovementKind,
    product: &str,
    quantity: i64,
    note: Option<String>,
) -> Result<()> {
    let actor = actor(settings)?;
    let product = service.find_product(product).await?;

    let result = service
        .record_movement(product.id, kind, quantity, actor, note)
        .await?;

    println!(
        "Recorded {}: {} x {} (balance {}, {})",
        result.movement.kind, result.movement.quantity, result.product_name, result.balance, result.movement.id
    );
    if result.balance <= product.min_stock {
        println!(
            "Warning: {} is at or below its minimum stock ({})",
            result.product_name, product.min_stock
        );
    }
    Ok(())
}

async fn run_low_stock_command(service: &InventoryService, limit: usize) -> Result<()> {
    let products = service.low_stock(limit).await?;
    if products.is_empty() {
        println!("No products at or below minimum stock.");
    } else {
        println!("{:<25} {:<15} {:>8} {:>8}", "NAME", "CATEGORY", "QTY", "MIN");
        println!("{}", "-".repeat(59));
        for product in products {
            println!(
                "{:<25} {:<15} {:>8} {:>8}",
                truncate(&product.name, 25),
                truncate(&product.category, 15),
                product.quantity,
                product.min_stock
            );
        }
    }
    Ok(())
}

async fn run_history_command(
    service: &InventoryService,
    filter: &HistoryFilter,
    limit: Option<usize>,
) -> Result<()> {
    let records = service.search_history(filter, limit).await?;

    if records.is_empty() {
        println!("No movements found.");
        return Ok(());
    }

    println!(
        "{:<17} {:<9} {:>6} {:<25} {:<20} NOTES",
        "DATE", "TYPE", "QTY", "PRODUCT", "RESPONSIBLE"
    );
    println!("{}", "-".repeat(96));
    for record in &records {
        let movement = &record.movement;
        println!(
            "{:<17} {:<9} {:>6} {:<25} {:<20} {}",
            movement.created_at.format("%Y-%m-%d %H:%M"),
            movement.kind.label(),
            movement.quantity,
            truncate(&record.product_name, 25),
            truncate(&movement.responsible_name, 20),
            truncate(movement.notes.as_deref().unwrap_or(""), 30)
        );
    }
    Ok(())
}

async fn run_dashboard_command(service: &InventoryService, settings: &Settings) -> Result<()> {
    let summary = service
        .dashboard(settings.low_stock_limit, settings.recent_movements)
        .await?;

    println!("Products:    {}", summary.total_products);
    println!("Units:       {}", summary.total_units);
    println!("Stock value: {}", format_cents(summary.total_value));
    println!(
        "Low stock:   {} ({:.1}%)",
        summary.low_stock_count,
        summary.low_stock_ratio()
    );

    if !summary.categories.is_empty() {
        println!();
        println!("{:<20} {:>9} {:>9}", "CATEGORY", "PRODUCTS", "UNITS");
        println!("{}", "-".repeat(40));
        for category in &summary.categories {
            println!(
                "{:<20} {:>9} {:>9}",
                truncate(&category.category, 20),
                category.products,
                category.units
            );
        }
    }

    if !summary.low_stock.is_empty() {
        println!();
        println!("Low stock:");
        for product in &summary.low_stock {
            println!(
                "  {:<25} {:>6} / {}",
                truncate(&product.name, 25),
                product.quantity,
                product.min_stock
            );
        }
    }

    if !summary.recent_movements.is_empty() {
        println!();
        println!("Recent movements:");
        for record in &summary.recent_movements {
            let movement = &record.movement;
            println!(
                "  {}  {:<8} {:>6}  {:<25} {}",
                movement.created_at.format("%Y-%m-%d %H:%M"),
                movement.kind.label(),
                movement.quantity,
                truncate(&record.product_name, 25),
                movement.responsible_name
            );
        }
    }

    Ok(())
}

async fn run_check_command(service: &InventoryService) -> Result<()> {
    println!("Checking stock ledger integrity...\n");

    let report = service.check_integrity().await?;

    println!("Products:  {}", report.product_count);
    println!("Movements: {}", report.movement_count);
    println!();

    if report.is_ok() {
        println!("Every balance matches its movement log.");
        return Ok(());
    }

    println!("Issues found:");
    if report.invalid_quantities > 0 {
        println!(
            "  - {} movements with a non-positive quantity",
            report.invalid_quantities
        );
    }
    for discrepancy in &report.discrepancies {
        println!(
            "  - {}: stored balance {} but log gives {}",
            discrepancy.product_name, discrepancy.stored, discrepancy.replayed
        );
    }
    for product_id in &report.negative_histories {
        println!("  - {}: log goes below zero", product_id);
    }
    anyhow::bail!("Stock ledger integrity check failed");
}

async fn run_export_command(
    service: &InventoryService,
    export_type: &str,
    output: Option<&str>,
) -> Result<()> {
    use crate::io::Exporter;
    use std::fs::File;
    use std::io::{stdout, Write};

    let exporter = Exporter::new(service);

    let writer: Box<dyn Write> = match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path))?;
            Box::new(file)
        }
        None => Box::new(stdout()),
    };

    match export_type {
        "products" => {
            let count = exporter.export_products_csv(writer).await?;
            if output.is_some() {
                eprintln!("Exported {} products", count);
            }
        }
        "movements" => {
            let count = exporter.export_movements_csv(writer).await?;
            if output.is_some() {
                eprintln!("Exported {} movements", count);
            }
        }
        "full" => {
            let snapshot = exporter.export_full_json(writer).await?;
            if output.is_some() {
                eprintln!(
                    "Exported full database: {} profiles, {} products, {} movements",
                    snapshot.profiles.len(),
                    snapshot.products.len(),
                    snapshot.movements.len()
                );
            }
        }
        _ => {
            anyhow::bail!(
                "Invalid export type '{}'. Valid types: products, movements, full",
                export_type
            );
        }
    }

    Ok(())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
