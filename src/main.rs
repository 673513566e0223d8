use anyhow::Context;
use clap::Parser;
use clinic_etl::app::export;
use clinic_etl::config::cli::OutputFormat;
use clinic_etl::utils::{logger, validation::Validate};
use clinic_etl::{AggregationPipeline, CliConfig, ClinicError, RefreshController, Snapshot};
use std::io::Write;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    // 初始化日誌
    if cli.json_logs {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting clinic-etl CLI");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    // 載入並驗證配置
    let config = match cli.resolve().and_then(|config| {
        config.validate()?;
        Ok(config)
    }) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("❌ Configuration validation failed: {}", e);
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(1);
        }
    };

    let pipeline = AggregationPipeline::with_http(&config).context("building HTTP client")?;
    let controller = RefreshController::new(pipeline);

    // Ctrl-C 取消刷新
    let canceller = controller.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() && canceller.cancel() {
            tracing::warn!("🛑 Interrupt received, cancelling refresh");
        }
    });

    let snapshot = match controller.refresh().await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            let code = match e.as_ref() {
                ClinicError::Cancelled => 130,
                _ => 1,
            };
            tracing::error!("❌ Refresh failed: {}", e);
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(code);
        }
    };

    let view = match cli.search.as_deref() {
        Some(query) => snapshot.filtered(query),
        None => (*snapshot).clone(),
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match cli.format {
        OutputFormat::Summary => print_summary(&view, &mut out)?,
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut out, &view)?;
            writeln!(out)?;
        }
        OutputFormat::ServicesCsv => export::write_services_csv(&view.services, &mut out)?,
        OutputFormat::DoctorsCsv => export::write_doctors_csv(&view.doctors, &mut out)?,
    }
    out.flush()?;

    if snapshot.is_partial() {
        for failure in &snapshot.partial_failures {
            eprintln!("⚠️ {}", failure);
        }
        std::process::exit(2);
    }

    Ok(())
}

fn print_summary<W: Write>(snapshot: &Snapshot, out: &mut W) -> std::io::Result<()> {
    writeln!(
        out,
        "📦 Snapshot fetched at {}",
        snapshot.fetched_at.format("%Y-%m-%d %H:%M:%S UTC")
    )?;

    writeln!(out, "\n👩‍⚕️ Doctors ({})", snapshot.doctors.len())?;
    for doctor in &snapshot.doctors {
        writeln!(out, "  {} - {}", doctor.name, doctor.specialty)?;
    }

    writeln!(out, "\n🏥 Departments ({})", snapshot.departments.len())?;
    for department in &snapshot.departments {
        writeln!(out, "  {}", department.name)?;
    }

    writeln!(out, "\n💳 Services ({})", snapshot.services.len())?;
    for category in snapshot.service_categories() {
        writeln!(out, "  [{}]", category)?;
        for service in snapshot.services.iter().filter(|s| s.category == category) {
            writeln!(out, "    {:<50} {:>10.2}", service.name, service.price)?;
        }
    }

    Ok(())
}
