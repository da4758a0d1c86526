use clap::Parser;
use peer_eval::config::Command;
use peer_eval::core::export;
use peer_eval::core::Storage;
use peer_eval::utils::error::ValidationFailure;
use peer_eval::utils::{logger, validation::Validate};
use peer_eval::{
    CliConfig, EvalError, EvaluationApp, FileKeyValueStore, LocalStorage, RatingSheet,
    RosterStore, SubmissionLedger,
};

type App = EvaluationApp<FileKeyValueStore>;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = CliConfig::parse();

    // 初始化日誌
    logger::init_cli_logger(config.verbose, config.log_json);

    tracing::info!("Starting peer-eval CLI");
    tracing::debug!("CLI config: {:?}", config);

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    // 載入名單與設定，失敗即停止
    let result = match config.data_source() {
        Ok(source) => RosterStore::load(source.as_ref()).await,
        Err(e) => Err(e),
    };
    let roster = match result {
        Ok(roster) => roster,
        Err(e) => exit_with(e),
    };

    // 建立提交紀錄與輸出儲存
    let ledger = SubmissionLedger::new(FileKeyValueStore::new(&config.ledger_dir));
    let app = EvaluationApp::new(roster, ledger);
    let storage = LocalStorage::new(config.output_path.clone());

    if let Err(e) = run(&app, &storage, config.command).await {
        exit_with(e);
    }

    Ok(())
}

fn exit_with(e: EvalError) -> ! {
    // 記錄詳細錯誤信息
    tracing::error!(
        "❌ {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    // 輸出用戶友好的錯誤信息
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());

    // 根據錯誤嚴重程度決定退出碼
    std::process::exit(e.severity().exit_code());
}

async fn run(app: &App, storage: &LocalStorage, command: Command) -> peer_eval::Result<()> {
    match command {
        Command::Roster => {
            show_roster(app);
            Ok(())
        }
        Command::Status { evaluator } => {
            let participant = app.roster().find_participant(&evaluator).ok_or_else(|| {
                ValidationFailure::UnknownParticipant {
                    id: evaluator.clone(),
                }
            })?;
            if app.ledger().has_submitted(&participant.id)? {
                println!("✅ {} ({}) has submitted", participant.name, participant.id);
            } else {
                println!("⏳ {} ({}) has not submitted yet", participant.name, participant.id);
            }
            Ok(())
        }
        Command::Submit {
            evaluator,
            members,
            ratings,
            comments,
            email,
        } => {
            let mut selection = app.login(&evaluator)?;
            for member in &members {
                app.select(&mut selection, member)?;
            }
            tracing::debug!("Selected group {}", selection.progress_label());

            let mut sheet = RatingSheet::new();
            for (id, value) in ratings {
                sheet.rate(id, value);
            }
            for (id, text) in comments {
                sheet.comment(id, text);
            }

            let submission = app.submit(&selection, &sheet)?;
            // 提交後立即輸出個人 CSV
            let file_name = export::submission_file_name(&submission, today());
            storage
                .write_file(&file_name, app.ledger().to_csv(&submission)?.as_bytes())
                .await?;

            println!(
                "✅ Evaluation submitted for {} ({} evaluations)",
                submission.evaluator_name,
                submission.evaluations.len()
            );
            println!("📁 CSV saved to: {}/{}", storage.base_path(), file_name);

            if email {
                println!("📧 {}", app.email_draft(&submission)?.mailto_url());
            }
            Ok(())
        }
        Command::Export {
            evaluator,
            archive,
            stdout,
        } => {
            let date = today();
            let (file_name, content) = if archive {
                (export::archive_file_name(date), app.export_archive(date)?)
            } else if let Some(evaluator) = evaluator {
                let submission = app
                    .latest_submission(&evaluator)?
                    .ok_or(ValidationFailure::NothingToExport)?;
                (
                    export::submission_file_name(&submission, date),
                    app.ledger().to_csv(&submission)?.into_bytes(),
                )
            } else {
                (export::all_file_name(date), app.export_all()?.into_bytes())
            };

            if stdout {
                print!("{}", String::from_utf8_lossy(&content));
            } else {
                storage.write_file(&file_name, &content).await?;
                println!("📁 Export saved to: {}/{}", storage.base_path(), file_name);
            }
            Ok(())
        }
        Command::Stats => {
            let stats = app.statistics()?;
            if stats.submission_count == 0 {
                println!("No evaluation data available.");
                return Ok(());
            }
            println!("📊 Evaluation Statistics");
            println!("  Submissions: {}", stats.submission_count);
            println!("  Participation: {:.1}%", stats.submission_rate_percent);
            println!("  Total Evaluations: {}", stats.evaluation_count);
            println!("  Average Rating: {:.1}", stats.average_rating);
            Ok(())
        }
        Command::Email { evaluator } => {
            let submission = app
                .latest_submission(&evaluator)?
                .ok_or(ValidationFailure::NothingToExport)?;
            let draft = app.email_draft(&submission)?;
            println!("To: {}", draft.to);
            println!("Subject: {}", draft.subject);
            println!();
            println!("{}", draft.body);
            println!();
            println!("📧 {}", draft.mailto_url());
            Ok(())
        }
        Command::Clear { yes } => {
            app.clear(yes)?;
            println!("All evaluation data has been cleared.");
            Ok(())
        }
    }
}

fn show_roster(app: &App) {
    let config = app.roster().config();
    println!("📋 Participants:");
    for participant in app.roster().participants() {
        println!("  {} ({})", participant.name, participant.id);
    }
    println!();
    println!(
        "👥 Group size: {} to {}",
        config.min_group_size(),
        config.max_group_size()
    );
    println!("📧 Instructor: {}", config.instructor_email());
    println!("🎯 Rating scale:");
    for level in app.roster().rating_scale().levels() {
        println!("  {:>6} {}", level.value, level.label);
    }
}

fn today() -> chrono::NaiveDate {
    chrono::Utc::now().date_naive()
}
