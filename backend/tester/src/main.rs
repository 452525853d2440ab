use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use ledger::{
    NewEcoAction,
    payloads::{
        AddScoreResponse, BasicChatInput, BasicChatResponse, ChatInput, ChatResponse, ErrorBody,
        InitializeResponse, LogActionResponse, PingResponse, ScoreInput, ScoreResponse,
    },
};
use reqwest::{Client, Response};
use serde::{Serialize, de::DeserializeOwned};

#[derive(Parser, Debug)]
#[command(author, version, about = "Pokes a running eco backend")]
struct Args {
    #[arg(long, default_value = "http://localhost:8000")]
    url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Ping,
    Init {
        user_id: String,
        #[arg(allow_negative_numbers = true)]
        points: i64,
    },
    Add {
        user_id: String,
        #[arg(allow_negative_numbers = true)]
        points: i64,
    },
    Get { user_id: String },
    Log {
        user_id: String,
        name: String,
        points: i64,
        #[arg(long, default_value = "general")]
        category: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value = "low")]
        impact: String,
        #[arg(long, default_value_t = 0.0)]
        carbon: f64,
        #[arg(long, default_value_t = 0.0)]
        water: f64,
        #[arg(long, default_value_t = 0.0)]
        waste: f64,
        #[arg(long, default_value_t = 0.0)]
        energy: f64,
    },
    Chat {
        message: String,
        #[arg(long)]
        user_id: Option<String>,
    },
    BasicChat { message: String },
}

struct Backend {
    client: Client,
    url: String,
}

impl Backend {
    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> anyhow::Result<T> {
        let response = self
            .client
            .get(format!("{}{path}", self.url))
            .query(query)
            .send()
            .await
            .with_context(|| format!("GET {path}"))?;

        decode(response).await
    }

    async fn post<S: Serialize, T: DeserializeOwned>(&self, path: &str, body: &S) -> anyhow::Result<T> {
        let response = self
            .client
            .post(format!("{}{path}", self.url))
            .json(body)
            .send()
            .await
            .with_context(|| format!("POST {path}"))?;

        decode(response).await
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> anyhow::Result<T> {
    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        let detail = serde_json::from_str::<ErrorBody>(&text)
            .map(|body| match body.action_id {
                Some(id) => format!("{} (action {id})", body.detail),
                None => body.detail,
            })
            .unwrap_or(text);

        bail!("{status}: {detail}");
    }

    Ok(serde_json::from_str(&text)?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let backend = Backend {
        client: Client::new(),
        url: args.url.trim_end_matches('/').to_string(),
    };

    match args.command {
        Command::Ping => {
            let response: PingResponse = backend.get("/ping", &[]).await?;
            println!("{}", response.status);
        }
        Command::Init { user_id, points } => {
            let response: InitializeResponse = backend
                .post("/initialize-score", &ScoreInput { user_id, points })
                .await?;
            println!("{}", response.message);
        }
        Command::Add { user_id, points } => {
            let response: AddScoreResponse =
                backend.post("/add-score", &ScoreInput { user_id, points }).await?;
            println!("{}: {} -> {}", response.message, response.old_points, response.new_points);
        }
        Command::Get { user_id } => {
            let response: ScoreResponse = backend.get("/get-score", &[("user_id", user_id.as_str())]).await?;
            println!("{} has {} points", response.user_id, response.points);
        }
        Command::Log {
            user_id,
            name,
            points,
            category,
            description,
            impact,
            carbon,
            water,
            waste,
            energy,
        } => {
            let action = NewEcoAction {
                user_id,
                name,
                points,
                category,
                description,
                impact,
                carbon_saved: carbon,
                water_saved: water,
                waste_saved: waste,
                energy_saved: energy,
            };

            let response: LogActionResponse = backend.post("/log-action", &action).await?;
            println!("{}, total now {}", response.message, response.new_total_points);
        }
        Command::Chat { message, user_id } => {
            let response: ChatResponse = backend.post("/chat", &ChatInput { message, user_id }).await?;
            if let Some(totals) = response.totals {
                println!("{totals:?}");
            }
            println!("{}", response.reply);
        }
        Command::BasicChat { message } => {
            let response: BasicChatResponse =
                backend.post("/basic_chat", &BasicChatInput { message }).await?;
            println!("{}", response.reply);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_points_parse() {
        let args = Args::try_parse_from(["tester", "init", "u1", "-5"]).unwrap();
        assert!(matches!(args.command, Command::Init { points: -5, .. }));

        let args = Args::try_parse_from(["tester", "add", "u1", "-3"]).unwrap();
        assert!(matches!(args.command, Command::Add { points: -3, .. }));
    }
}
