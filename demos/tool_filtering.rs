//! Tool filtering over an in-process filesystem tool server.
//!
//! Usage:
//!   cargo run --example tool_filtering
//!   cargo run --example tool_filtering -- --mode dynamic
//!   cargo run --example tool_filtering -- --mode roles --concurrency 4
//!   TOOL_FILTER_BLOCKED=delete_file,write_file cargo run --example tool_filtering -- --mode env
//!
//! Model settings come from MODEL_BASE_URL / MODEL_API_KEY / MODEL_NAME and
//! are only reported here; no model is called.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use clap::{Parser, ValueEnum};
use mcp_tool_filter::{
    predicate_fn, AgentIdentity, FilterConfig, FilteredToolServer, ModelConfig,
    RolePolicy, StaticFilter, ToolCatalog, ToolDescriptor, ToolFilterEngine, ToolHandler,
};
use serde_json::{json, Value};

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    /// Block delete_file by name
    Static,
    /// Only tools starting with read_ or list_
    Dynamic,
    /// ReadOnlyAgent / AdminAgent / BasicAgent
    Roles,
    /// Allow/block lists from TOOL_FILTER_ALLOWED / TOOL_FILTER_BLOCKED
    Env,
}

#[derive(Parser)]
#[command(name = "tool_filtering", about = "Filter MCP-style tools per agent")]
struct Cli {
    #[arg(long, value_enum, default_value_t = Mode::Static)]
    mode: Mode,

    /// Max predicate evaluations in flight
    #[arg(long, default_value_t = 1)]
    concurrency: usize,
}

fn resolve(root: &Path, input: &Value) -> Result<PathBuf, String> {
    let rel = input["path"].as_str().unwrap_or(".");
    let rel = Path::new(rel);
    if rel
        .components()
        .any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)))
    {
        return Err(format!("path escapes sample directory: {}", rel.display()));
    }
    Ok(root.join(rel))
}

struct ReadFile(PathBuf);
struct ListDirectory(PathBuf);
struct WriteFile(PathBuf);
struct DeleteFile(PathBuf);

#[async_trait]
impl ToolHandler for ReadFile {
    async fn call(&self, input: &Value) -> Result<String, String> {
        let path = resolve(&self.0, input)?;
        tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| e.to_string())
    }
}

#[async_trait]
impl ToolHandler for ListDirectory {
    async fn call(&self, input: &Value) -> Result<String, String> {
        let path = resolve(&self.0, input)?;
        let mut entries = tokio::fs::read_dir(&path).await.map_err(|e| e.to_string())?;
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| e.to_string())? {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names.join("\n"))
    }
}

#[async_trait]
impl ToolHandler for WriteFile {
    async fn call(&self, input: &Value) -> Result<String, String> {
        let path = resolve(&self.0, input)?;
        let content = input["content"].as_str().unwrap_or("");
        tokio::fs::write(&path, content)
            .await
            .map_err(|e| e.to_string())?;
        Ok(format!("wrote {} bytes", content.len()))
    }
}

#[async_trait]
impl ToolHandler for DeleteFile {
    async fn call(&self, input: &Value) -> Result<String, String> {
        let path = resolve(&self.0, input)?;
        tokio::fs::remove_file(&path)
            .await
            .map_err(|e| e.to_string())?;
        Ok("deleted".into())
    }
}

fn path_schema(extra: Value) -> Value {
    let mut schema = json!({
        "type": "object",
        "properties": { "path": { "type": "string" } },
        "required": ["path"]
    });
    if let (Some(props), Some(extra)) = (schema["properties"].as_object_mut(), extra.as_object()) {
        props.extend(extra.clone());
    }
    schema
}

fn filesystem_server(root: &Path) -> ToolCatalog {
    ToolCatalog::new("filesystem")
        .add(
            ToolDescriptor::new("read_file")
                .with_description("Read a file from the sample directory")
                .with_input_schema(path_schema(json!({}))),
            ReadFile(root.to_path_buf()),
        )
        .add(
            ToolDescriptor::new("list_directory")
                .with_description("List entries of a directory")
                .with_input_schema(path_schema(json!({}))),
            ListDirectory(root.to_path_buf()),
        )
        .add(
            ToolDescriptor::new("write_file")
                .with_description("Write content to a file")
                .with_input_schema(path_schema(json!({"content": {"type": "string"}}))),
            WriteFile(root.to_path_buf()),
        )
        .add(
            ToolDescriptor::new("delete_file")
                .with_description("Delete a file")
                .with_input_schema(path_schema(json!({}))),
            DeleteFile(root.to_path_buf()),
        )
}

fn build_filter(mode: Mode) -> Result<FilterConfig, Box<dyn std::error::Error>> {
    Ok(match mode {
        Mode::Static => StaticFilter::block(["delete_file"])?.into(),
        Mode::Dynamic => FilterConfig::dynamic(predicate_fn(|tool, _| {
            tool.name.starts_with("read_") || tool.name.starts_with("list_")
        })),
        Mode::Roles => RolePolicy::default().into(),
        Mode::Env => StaticFilter::from_env()?.into(),
    })
}

async fn show_agent(server: &FilteredToolServer<ToolCatalog>, agent: AgentIdentity) {
    let ctx = server.context_for(agent);
    let tools = server.tools_for_run(&ctx).await;
    let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
    println!("\n=== Agent: {} ===", ctx.agent.name);
    println!("available tools: {names:?}");

    let matches: Vec<String> = server
        .search_for(&ctx, "file")
        .await
        .iter()
        .filter_map(|t| t["name"].as_str().map(str::to_string))
        .collect();
    println!("search \"file\": {matches:?}");

    match server
        .call_tool_for(&ctx, "list_directory", &json!({"path": "."}))
        .await
    {
        Ok(listing) => println!("list_directory -> {}", listing.replace('\n', ", ")),
        Err(e) => println!("list_directory refused: {e}"),
    }
    match server
        .call_tool_for(&ctx, "delete_file", &json!({"path": "missing.txt"}))
        .await
    {
        Ok(out) => println!("delete_file -> {out}"),
        Err(e) => println!("delete_file refused: {e}"),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    println!("Model configuration:");
    println!("{}", ModelConfig::from_env());

    let samples = tempfile::tempdir()?;
    tokio::fs::write(samples.path().join("example.txt"), "This is a sample file.").await?;

    let server = FilteredToolServer::new(filesystem_server(samples.path()), build_filter(cli.mode)?)
        .with_engine(ToolFilterEngine::new().with_concurrency(cli.concurrency));

    println!("\nfilter: {:?}", server.config());

    let agents = match cli.mode {
        Mode::Roles => vec![
            AgentIdentity::new("ReadOnlyAgent"),
            AgentIdentity::new("AdminAgent"),
            AgentIdentity::new("BasicAgent"),
        ],
        _ => vec![AgentIdentity::new("Assistant")],
    };
    for agent in agents {
        show_agent(&server, agent).await;
    }

    Ok(())
}
