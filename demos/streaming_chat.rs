//! # 流式对话示例
//!
//! 这个示例展示了如何使用 CozeAI 库的流式功能：
//! - 从环境变量加载配置
//! - 创建 CozeClient 实例
//! - 实时输出增量回答
//! - 打印智能体推荐的追问

use cozeai::client::CozeClient;
use cozeai::config::Config;
use cozeai::error::Result;
use std::io::Write;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    // 需要设置 COZE_API_KEY 和 COZE_BOT_ID
    let config = Config::from_env()?.with_user_id_auto();
    let client = CozeClient::new(config);

    let prompt = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "请用三句话介绍一下你自己。".to_string());
    println!("提示: {}", prompt);

    let mut stdout = std::io::stdout();
    let response = client
        .chat_with_stats(&prompt, |text| {
            print!("{}", text);
            let _ = stdout.flush();
        })
        .await?;
    println!();

    for (i, question) in response.outcome.follow_up_questions.iter().enumerate() {
        println!("追问 {}: {}", i + 1, question);
    }
    println!("事件数: {}, 耗时: {}ms", response.stats.events, response.stats.duration_ms);

    std::io::stdout().flush()?;
    Ok(())
}
