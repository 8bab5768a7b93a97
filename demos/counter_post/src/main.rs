//! Counter Post Example
//!
//! Demonstrates a reblock app served statelessly: every request carries the
//! state returned by the previous response, and the worker keeps nothing
//! between requests.
//!
//! The post shows a like counter, a stopwatch driven by a timer cell, a
//! rename form and a view count loaded from storage.
//!
//! Pass a RON worker config as the first argument to override defaults:
//! ```text
//! cargo run -p counter_post -- worker.ron
//! ```

use reblock_core::{
    Capabilities, Component, Context, Element, Error, Event, FieldKind, FormField, FormSchema,
    KeyValueStore, MemoryStore, Node, ToastAppearance, Value,
};
use reblock_host::{Request, Response, Worker, WorkerConfig};
use std::sync::Arc;

fn post(props: &Value) -> Node {
    let author = props.str_field("author").unwrap_or("anonymous").to_string();

    Component::new("Post", move |_, scope| {
        let likes = scope.use_state(0i64)?;
        let title = scope.use_state("Untitled post")?;
        let elapsed = scope.use_state(0i64)?;

        let tick = elapsed.clone();
        let stopwatch = scope.use_interval(1000, move |d| {
            d.update(&tick, |v| Value::Int(v.as_int().unwrap_or(0) + 1))
        })?;

        let rename = title.clone();
        let schema = FormSchema::new()
            .title("Rename post")
            .accept_label("Save")
            .field(FormField::new("title", "Title", FieldKind::String).required());
        let form = scope.use_form(schema, move |values, d| {
            let next = values.get("title").cloned().unwrap_or_default();
            d.set(&rename, next)?;
            d.show_toast_with("Title updated", ToastAppearance::Success);
            Ok(())
        })?;

        let storage = scope.capabilities().storage.clone();
        let views = scope.use_async_state(move || async move {
            let views = storage.get("views")?.and_then(|v| v.as_int()).unwrap_or(0);
            Ok::<_, Error>(Value::Int(views + 1))
        })?;
        let Some(views) = views.ready() else {
            return Ok(Element::new("text").prop("text", "Loading...").into());
        };

        let running = scope.is_running(&stopwatch)?;
        let toggle = stopwatch.clone();
        let like = likes.clone();

        Ok(Element::new("vstack")
            .child(
                Element::new("text")
                    .prop("id", "title")
                    .prop("text", scope.get(&title)?.text().into_owned()),
            )
            .child(Element::new("text").prop("id", "author").prop("text", format!("by {author}")))
            .child(
                Element::new("text")
                    .prop("id", "views")
                    .prop("text", format!("{} views", scope.get(&views)?)),
            )
            .child(
                Element::new("button")
                    .prop("id", "like")
                    .prop("text", format!("Like ({})", scope.get(&likes)?))
                    .on_press(move |d| d.update(&like, |v| Value::Int(v.as_int().unwrap_or(0) + 1))),
            )
            .child(
                Element::new("button")
                    .prop("id", "stopwatch")
                    .prop(
                        "text",
                        format!(
                            "{} ({}s)",
                            if running { "Stop" } else { "Start" },
                            scope.get(&elapsed)?
                        ),
                    )
                    .on_press(move |d| {
                        if d.is_running(&toggle)? {
                            d.stop(&toggle)
                        } else {
                            d.start(&toggle)
                        }
                    }),
            )
            .child(
                Element::new("button")
                    .prop("id", "rename")
                    .prop("text", "Rename")
                    .on_press(move |d| d.open(&form)),
            )
            .into())
    })
    .into()
}

fn show(step: &str, response: &Response) {
    println!("--- {step} ---");
    if let Some(tree) = &response.tree {
        for id in ["title", "author", "views", "like", "stopwatch"] {
            if let Some(text) = tree.find_by_id(id).and_then(|node| node.text("text")) {
                println!("  [{id}] {text}");
            }
        }
    }
    for effect in &response.effects {
        println!("  effect: {effect:?}");
    }
    println!("  state: {} bytes\n", response.state.len());
}

fn missing(what: &str) -> reblock_host::Error {
    Error::component(format!("{what} not found in response")).into()
}

fn press(response: &Response, id: &str) -> reblock_host::Result<Request> {
    let event = response
        .action(id)
        .ok_or_else(|| missing(&format!("interactive element {id:?}")))?;
    Ok(response.next().event(event))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> reblock_host::Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => WorkerConfig::load(path)?,
        None => WorkerConfig::default(),
    };
    reblock_host::logging::init(&config.log_filter)?;

    println!("=== Reblock Counter Post Example ===\n");

    let storage = Arc::new(MemoryStore::new());
    storage
        .set("views", Value::Int(41))
        .map_err(reblock_core::Error::from)?;
    let capabilities = Capabilities::new().with_storage(storage);

    let mut worker = Worker::new(&config, capabilities, post);
    let props = Value::map([("author", "ada")]);

    let start = 1_700_000_000_000i64;
    let first = worker
        .handle(Request::fresh().props(props.clone()).at_ms(start))
        .await?;
    show("initial render", &first);

    let liked = worker
        .handle(press(&first, "like")?.props(props.clone()).at_ms(start + 100))
        .await?;
    show("liked", &liked);

    let running = worker
        .handle(press(&liked, "stopwatch")?.props(props.clone()).at_ms(start + 200))
        .await?;
    show("stopwatch started", &running);

    let mut current = running;
    for second in 1..=3 {
        let owner = current
            .effects
            .iter()
            .rev()
            .find_map(|effect| effect.owner().cloned())
            .ok_or_else(|| missing("armed timer"))?;
        current = worker
            .handle(
                current
                    .next()
                    .event(Event::TimerFired { owner })
                    .props(props.clone())
                    .at_ms(start + 200 + second * 1000),
            )
            .await?;
    }
    show("after three ticks", &current);

    let renaming = worker
        .handle(press(&current, "rename")?.props(props.clone()).at_ms(start + 3300))
        .await?;
    show("rename form shown", &renaming);

    let owner = renaming
        .effects
        .iter()
        .find_map(|effect| effect.owner().cloned())
        .ok_or_else(|| missing("shown form"))?;
    let mut values = reblock_core::ValueMap::new();
    values.insert("title".into(), Value::from("Hello, reblock"));
    let renamed = worker
        .handle(
            renaming
                .next()
                .event(Event::FormSubmitted { owner, values })
                .props(props.clone())
                .at_ms(start + 4000),
        )
        .await?;
    show("renamed", &renamed);

    let stopped = worker
        .handle(press(&renamed, "stopwatch")?.props(props).at_ms(start + 4100))
        .await?;
    show("stopwatch stopped", &stopped);

    println!(
        "Worker served {} requests; {} timer(s) still armed",
        worker.served(),
        worker.registry().timers().count()
    );
    worker.shutdown();

    Ok(())
}
