use std::{env, fs, path::Path};

use ts_rs::TS;

fn generate_types_content() -> String {
    let decls: Vec<String> = vec![
        db::types::TaskStatus::decl(),
        db::types::HistoryOrder::decl(),
        db::models::device::Device::decl(),
        db::models::device::DeviceWithStatus::decl(),
        db::models::task_status_log::TaskStatusLog::decl(),
        db::models::task_status_log::HistoryEntry::decl(),
        db::models::task_status_log::PageInfo::decl(),
        db::models::task_status_log::DeviceHistory::decl(),
        services::services::device::RegisterDevice::decl(),
        services::services::status::RecordStatus::decl(),
        services::services::history::HistoryQuery::decl(),
        services::services::task::RenameTask::decl(),
        task_checker::routes::auth::LoginRequest::decl(),
        task_checker::routes::devices::DeviceResponse::decl(),
        task_checker::routes::devices::DeviceListResponse::decl(),
        task_checker::routes::devices::MessageResponse::decl(),
        task_checker::routes::status::StatusResponse::decl(),
        utils::response::ApiResponse::decl(),
    ];

    let body = decls
        .into_iter()
        .map(|decl| {
            let trimmed = decl.trim_start();
            if trimmed.starts_with("export") {
                trimmed.to_string()
            } else {
                format!("export {trimmed}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "// This file was generated by `crates/server/src/bin/generate_types.rs`.\n\n// Do not edit this file manually.\n\n{body}\n"
    )
}

fn main() {
    let check_mode = env::args().any(|arg| arg == "--check");
    let shared_path = Path::new("shared/types.ts");
    let generated = generate_types_content();

    if check_mode {
        let current = fs::read_to_string(shared_path).unwrap_or_default();
        if current == generated {
            println!("✅ shared/types.ts is up to date.");
            std::process::exit(0);
        }
        eprintln!("❌ shared/types.ts is not up to date. Please run `cargo run --bin generate_types`.");
        std::process::exit(1);
    }

    if let Some(parent) = shared_path.parent() {
        if let Err(err) = fs::create_dir_all(parent) {
            eprintln!("Failed to create {}: {err}", parent.display());
            std::process::exit(1);
        }
    }
    if let Err(err) = fs::write(shared_path, generated) {
        eprintln!("Failed to write {}: {err}", shared_path.display());
        std::process::exit(1);
    }
    println!("✅ TypeScript types generated in shared/types.ts");
}
