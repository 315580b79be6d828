//! Hotpot concierge widget - terminal front-end
//!
//! Renders the conversation as text and maps typed commands onto the same
//! widget operations a browser front-end binds to its buttons. Plain lines
//! are sent as chat messages; lines starting with `/` are commands (`/help`).

use std::sync::Arc;

use anyhow::Context as _;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hotpot_widget::catalog::Allergy;
use hotpot_widget::core::{BrothStep, ChatOrchestrator, ConversationContext, Submission};
use hotpot_widget::{render, Backend, Config, HttpBackend};

const HELP: &str = "\
命令:
  <文字>                 发送消息
  /guests <n>            设置人数
  /broth <+|-> <锅底>    增减锅底 (名称或序号)
  /broths                列出锅底
  /allergy <花生|海鲜|面筋>  切换过敏项
  /recommend             食材推荐
  /toggle <id>           勾选/取消推荐食材
  /card                  查看当前推荐
  /confirm               确认下单
  /about <锅底>          锅底知识
  /ingredient <食材>     食材信息
  /ingredients           列出食材
  /status                查看状态
  /quit                  退出";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hotpot_widget=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::from_env()?;
    let widget = config
        .load_widget()
        .context("failed to load widget configuration")?;
    let backend: Arc<dyn Backend> = Arc::new(HttpBackend::from_config(&config)?);

    let ctx = Arc::new(ConversationContext::new(widget));
    let orchestrator = Arc::new(ChatOrchestrator::new(ctx.clone(), backend));

    tracing::info!("🍲 Concierge widget talking to {}", config.api_url);

    tokio::spawn(render_loop(ctx.clone()));
    {
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move {
            orchestrator.load_ingredients().await;
        });
    }

    println!("{}\n", HELP);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim_end().to_string();
        if line == "/quit" {
            break;
        }
        if let Err(e) = dispatch(&orchestrator, &line) {
            println!("[提示] {}", e);
        }
    }

    Ok(())
}

/// Print transcript entries as they are appended
async fn render_loop(ctx: Arc<ConversationContext>) {
    let mut revisions = ctx.subscribe();
    let mut printed = 0;
    loop {
        let state = ctx.snapshot();
        for entry in &state.transcript.entries()[printed..] {
            println!("{}\n", render::entry(&state, entry));
        }
        printed = state.transcript.len();

        if revisions.changed().await.is_err() {
            break;
        }
    }
}

fn dispatch(orchestrator: &Arc<ChatOrchestrator>, line: &str) -> anyhow::Result<()> {
    let ctx = orchestrator.context();
    let (command, arg) = match line.strip_prefix('/') {
        Some(rest) => {
            let mut parts = rest.splitn(2, ' ');
            let command = parts.next().unwrap_or_default();
            (command, parts.next().unwrap_or_default().trim())
        }
        None => {
            spawn_submission(orchestrator, line.to_string(), |o, text| async move {
                o.send_message(&text).await
            });
            return Ok(());
        }
    };

    match command {
        "help" => println!("{}", HELP),
        "guests" => {
            let n: u32 = arg.parse().context("人数应为整数")?;
            if !ctx.config().accepts_guests(n) {
                anyhow::bail!("人数应在 1..={} 之间", ctx.config().guests.max);
            }
            orchestrator.set_guest_count(n)?;
            println!("{}", ctx.read(render::broth_summary));
        }
        "broth" => {
            let (sign, name) = arg.split_once(' ').context("用法: /broth <+|-> <锅底>")?;
            let step = match sign {
                "+" => BrothStep::Increment,
                "-" => BrothStep::Decrement,
                _ => anyhow::bail!("用法: /broth <+|-> <锅底>"),
            };
            let name = resolve_broth(ctx, name.trim())?;
            if !orchestrator.adjust_broth(&name, step)? {
                println!("[提示] {} 已到上限或为 0", name);
            }
            println!("{}", ctx.read(render::broth_summary));
        }
        "broths" => {
            for (i, name) in ctx.config().catalog.broths.iter().enumerate() {
                println!("{:>2}. {}", i + 1, name);
            }
        }
        "allergy" => {
            let allergy: Allergy = arg.parse()?;
            orchestrator.toggle_allergy(allergy);
            println!("{}", ctx.read(render::allergy_summary));
        }
        "recommend" => {
            spawn_submission(orchestrator, String::new(), |o, _| async move {
                o.recommend().await
            });
        }
        "toggle" => {
            let orchestrator = orchestrator.clone();
            let id = arg.to_string();
            tokio::spawn(async move {
                if let Err(e) = orchestrator.toggle_item(&id).await {
                    println!("[提示] {}", e);
                }
            });
        }
        "card" => match ctx.read(|s| s.cart.active_recommendation().map(render::recommend_card)) {
            Some(card) => println!("{}", card),
            None => println!("[提示] 还没有推荐"),
        },
        "confirm" => {
            spawn_submission(orchestrator, String::new(), |o, _| async move {
                o.confirm_order().await
            });
        }
        "about" => {
            let name = resolve_broth(ctx, arg)?;
            spawn_submission(orchestrator, name, |o, name| async move {
                o.ask_about_broth(&name).await
            });
        }
        "ingredient" => {
            spawn_submission(orchestrator, arg.to_string(), |o, name| async move {
                o.ask_about_ingredient(&name).await
            });
        }
        "ingredients" => {
            for ingredient in ctx.read(|s| s.ingredients.clone()) {
                println!("  {}", ingredient.label());
            }
        }
        "status" => println!("{}", ctx.read(render::status)),
        other => anyhow::bail!("未知命令: /{}", other),
    }
    Ok(())
}

/// Run a network-bound action in the background so the prompt stays live
fn spawn_submission<F, Fut>(orchestrator: &Arc<ChatOrchestrator>, arg: String, action: F)
where
    F: FnOnce(Arc<ChatOrchestrator>, String) -> Fut + Send + 'static,
    Fut: std::future::Future<Output = Submission> + Send + 'static,
{
    let orchestrator = orchestrator.clone();
    tokio::spawn(async move {
        match action(orchestrator.clone(), arg).await {
            Submission::Blocked => println!("[提示] 正在等待回复，请稍候"),
            Submission::NotConfirmable => {
                let hint = orchestrator.context().gate().hint().unwrap_or_default();
                println!("[提示] {}", hint);
            }
            _ => {}
        }
    });
}

/// Accept a broth by name or by its 1-based position in the catalog
fn resolve_broth(ctx: &ConversationContext, input: &str) -> anyhow::Result<String> {
    let broths = &ctx.config().catalog.broths;
    if let Ok(index) = input.parse::<usize>() {
        return broths
            .get(index.wrapping_sub(1))
            .cloned()
            .with_context(|| format!("没有第 {} 款锅底", index));
    }
    broths
        .iter()
        .find(|b| b.as_str() == input)
        .cloned()
        .with_context(|| format!("未知锅底: {}", input))
}
