// Basic invocation example against a live backend
//
// Run with: cargo run -p quipu-invoke --example basic_query -- <function-name>
//
// The function name is the deployed inference endpoint; the region
// defaults to us-east-1.

use quipu_invoke::{registry::shared_client, RequestEnvelope, DEFAULT_REGION};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let function_name = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "sigma-inference".to_string());

    let client = shared_client(&function_name, DEFAULT_REGION)?;

    let question = "PBI de Ica en el 2022";
    let request = RequestEnvelope::query(question, "example-session");

    println!("Pregunta: {question}");
    let response = client.invoke_sync(&request).await;

    if response.is_error() {
        // The UI would show its friendly fallback here.
        println!("La consulta falló: {}", response.body);
        return Ok(());
    }

    let body = response.body_json()?;
    println!("Respuesta: {}", body["answer"]);
    if let Some(request_id) = &response.metadata.request_id {
        println!("Request id: {request_id}");
    }

    Ok(())
}
