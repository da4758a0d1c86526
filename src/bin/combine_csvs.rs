use anyhow::Context;
use clap::Parser;
use peer_eval::core::combine::combine_csv_files;
use peer_eval::core::report::AnalysisReport;
use peer_eval::utils::logger;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "combine-csvs")]
#[command(about = "Combine per-student evaluation CSV files into one master file")]
struct Args {
    /// Folder containing the student CSV files
    #[arg(default_value = "./submissions")]
    input_folder: PathBuf,

    /// Combined CSV to write
    #[arg(default_value = "combined_evaluations.csv")]
    output_file: PathBuf,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    // 初始化日誌
    logger::init_cli_logger(args.verbose, false);

    println!("🎓 Cooperative Evaluation CSV Combiner");
    println!("{}", "=".repeat(40));
    println!("📁 Input folder: {}", args.input_folder.display());
    println!("📄 Output file: {}", args.output_file.display());
    println!();

    // 合併所有學生 CSV
    let summary = match combine_csv_files(&args.input_folder, &args.output_file) {
        Ok(summary) => summary,
        Err(e) => {
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("\n❌ Process failed!");
            std::process::exit(1);
        }
    };

    println!();
    println!("✅ Combined CSV created: {}", summary.output_file.display());
    println!("📊 Total records: {}", summary.total_records);
    println!("👥 Unique evaluators: {}", summary.unique_evaluators);

    println!();
    println!("📈 Summary by student:");
    println!(
        "  {:<12} {:<32} {:>17} {:>16}",
        "Evaluator ID", "Evaluator Name", "Evaluations_Given", "Avg_Rating_Given"
    );
    for evaluator in &summary.evaluators {
        println!(
            "  {:<12} {:<32} {:>17} {:>16.2}",
            evaluator.evaluator_id,
            evaluator.evaluator_name,
            evaluator.evaluations_given,
            evaluator.avg_rating_given
        );
    }

    if !summary.error_files.is_empty() {
        println!();
        println!("⚠️  Files with errors ({}):", summary.error_files.len());
        for (path, reason) in &summary.error_files {
            println!("   - {} ({})", path.display(), reason);
        }
    }

    // 對合併結果做統計分析
    let report = AnalysisReport::from_csv_file(&summary.output_file)
        .with_context(|| format!("reading {}", summary.output_file.display()))?;
    println!();
    print!("{}", report);

    println!();
    println!("✅ Process completed successfully!");
    println!("📧 Combined file: {}", summary.output_file.display());
    println!("📊 You can now analyze the data in Excel or similar tools");

    Ok(())
}
