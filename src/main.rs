use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wordforge::{convert_file, discover_metadata, ConvertOptions, Epub, PackageMeta, Result};

/// 📚 WordForge - Word HTML转EPUB工具
#[derive(Parser)]
#[command(name = "wordforge")]
#[command(about = "把Word导出的HTML文档转换为竖排EPUB3电子书")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// 转换HTML为EPUB
    Convert {
        /// 输入的HTML文件
        #[arg(help = "Word导出的HTML文件路径")]
        input: PathBuf,

        /// 输出的EPUB文件
        #[arg(help = "要生成的EPUB文件路径")]
        output: PathBuf,

        /// 元数据文件
        #[arg(help = "元数据YAML文件(省略时自动查找metadata.yaml)")]
        metadata: Option<PathBuf>,

        /// 章节标记
        #[arg(long, default_value = wordforge::config::DEFAULT_MARKER, help = "章节标题段落class中包含的标记")]
        marker: String,

        /// 外文片段的lang值
        #[arg(long, default_value = wordforge::config::DEFAULT_FOREIGN_LANG, help = "标题中外文片段的lang属性值")]
        foreign_lang: String,
    },

    /// 检查EPUB文件
    Inspect {
        /// EPUB文件路径
        #[arg(help = "要检查的EPUB文件路径")]
        epub: PathBuf,

        /// 详细输出模式
        #[arg(short, long, help = "显示所有条目与清单项")]
        verbose: bool,
    },
}

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let args = Args::parse();

    println!("📚 WordForge - Word HTML转EPUB工具");

    let result = match args.command {
        Command::Convert {
            input,
            output,
            metadata,
            marker,
            foreign_lang,
        } => {
            let options = ConvertOptions::default()
                .with_marker(marker)
                .with_foreign_lang(foreign_lang);
            run_convert(&input, &output, metadata, &options)
        }
        Command::Inspect { epub, verbose } => run_inspect(&epub, verbose),
    };

    match result {
        Ok(_) => println!("🎉 处理完成！"),
        Err(e) => {
            eprintln!("❌ 错误: {}", e);
            process::exit(1);
        }
    }
}

fn run_convert(input: &Path, output: &Path, metadata: Option<PathBuf>, options: &ConvertOptions) -> Result<()> {
    println!("📄 输入文件: {}", input.display());

    let metadata = metadata.or_else(|| discover_metadata(input));
    if let Some(path) = &metadata {
        println!("📋 元数据文件: {}", path.display());
    }
    let meta = PackageMeta::load_or_default(metadata.as_deref());

    println!("  📖 书名: {}", meta.title);
    println!("  ✍️  作者: {}", meta.author);
    println!("  ↔️  翻页方向: {}", meta.page_progression);

    let conversion = convert_file(input, output, &meta, options)?;

    println!("\n📑 章节 ({} 个):", conversion.chapters.len());
    for chapter in &conversion.chapters {
        println!("  {}. {}", chapter.index, chapter.title);
    }

    let images = conversion.package.manifest.iter().filter(|item| item.is_image()).count();
    if images > 0 {
        println!("🖼️  图片: {} 个", images);
    }

    println!("\n💾 已生成: {}", output.display());
    Ok(())
}

fn run_inspect(path: &Path, verbose: bool) -> Result<()> {
    println!("正在检查EPUB文件: {}", path.display());

    // 打开时会验证mimetype
    let mut epub = Epub::from_path(path)?;
    println!("✅ mimetype验证通过");

    println!("\n📁 EPUB文件内容:");
    let files = epub.list_files()?;
    if verbose {
        for (i, file) in files.iter().enumerate() {
            println!("  {}. {}", i + 1, file);
        }
    } else {
        println!("  共找到 {} 个文件", files.len());
    }

    let container = epub.parse_container()?;
    println!("\n📦 Container.xml信息:");
    println!("  找到 {} 个 rootfile 条目", container.rootfiles.len());
    if let Some(opf_path) = container.get_opf_path() {
        println!("  📚 主OPF文件路径: {}", opf_path);
    }

    let opf = epub.parse_opf()?;
    println!("\n📊 EPUB元数据信息:");
    println!("  📖 EPUB版本: {}", opf.version);
    if let Some(title) = &opf.title {
        println!("    标题: {}", title);
    }
    if let Some(creator) = &opf.creator {
        println!("    作者: {}", creator);
    }
    if let Some(language) = &opf.language {
        println!("    语言: {}", language);
    }
    if let Some(direction) = opf.page_progression {
        println!("    翻页方向: {}", direction);
    }

    println!("\n  📁 文件统计:");
    println!("    清单项目: {} 个", opf.manifest.len());
    println!("    脊柱项目: {} 个", opf.spine.len());
    if let Some(nav_path) = opf.get_nav_path() {
        println!("    导航文档: {}", nav_path);
    }

    if verbose {
        println!("\n  🧭 阅读顺序:");
        for (i, href) in opf.get_spine_paths().iter().enumerate() {
            println!("    {}. {}", i + 1, href);
        }
    }

    let problems = opf.check_spine();
    if problems.is_empty() {
        println!("\n✅ 清单与脊柱检查通过");
    } else {
        println!("\n⚠️  发现 {} 个问题:", problems.len());
        for problem in &problems {
            println!("  - {}", problem);
        }
    }

    Ok(())
}
