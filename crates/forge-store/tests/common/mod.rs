//! Toy asset graph shared by the store integration tests
//!
//! ```text
//!            Top (writable: top.txt)
//!           /   \
//!        Left   Right      NeedsFailing -> Left, Failing -> Base
//!           \   /
//!            Base          CycleA <-> CycleB
//!
//!   SlowCycleHead -> Slow, SlowCycleTail -> SlowCycleHead
//! ```

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use forge_asset::{
    async_trait, Asset, AssetFile, AssetKey, FileFetcher, GenerateContext, GenerateError,
    LoadError, Parents, Registry, Services, ValidationError, WritableAsset,
};
use serde::{Deserialize, Serialize};

/// Records every generation so tests can count them per store
#[derive(Debug, Default)]
pub struct GenerationLog(Mutex<Vec<&'static str>>);

impl GenerationLog {
    pub fn record(&self, name: &'static str) {
        self.0.lock().unwrap().push(name);
    }

    pub fn count(&self, name: &str) -> usize {
        self.0.lock().unwrap().iter().filter(|n| **n == name).count()
    }

    pub fn total(&self) -> usize {
        self.0.lock().unwrap().len()
    }
}

/// When set, `Interruptible` reports cancellation from inside `generate`
#[derive(Debug, Default)]
pub struct Interrupt(pub AtomicBool);

fn log(ctx: &GenerateContext, name: &'static str) -> Result<(), GenerateError> {
    ctx.service::<Arc<GenerationLog>>()?.record(name);
    Ok(())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Base {
    pub value: u32,
}

#[async_trait]
impl Asset for Base {
    const KEY: AssetKey = AssetKey::new("test.Base");

    fn name(&self) -> &'static str {
        "Base"
    }

    async fn generate(&mut self, _: &Parents, ctx: &GenerateContext) -> Result<(), GenerateError> {
        log(ctx, "Base")?;
        self.value = 7;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Left {
    pub value: u32,
}

#[async_trait]
impl Asset for Left {
    const KEY: AssetKey = AssetKey::new("test.Left");

    fn name(&self) -> &'static str {
        "Left"
    }

    fn dependencies(&self) -> Vec<AssetKey> {
        vec![Base::KEY]
    }

    async fn generate(&mut self, parents: &Parents, ctx: &GenerateContext) -> Result<(), GenerateError> {
        log(ctx, "Left")?;
        self.value = parents.get::<Base>()?.value + 1;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Right {
    pub value: u32,
}

#[async_trait]
impl Asset for Right {
    const KEY: AssetKey = AssetKey::new("test.Right");

    fn name(&self) -> &'static str {
        "Right"
    }

    fn dependencies(&self) -> Vec<AssetKey> {
        vec![Base::KEY]
    }

    async fn generate(&mut self, parents: &Parents, ctx: &GenerateContext) -> Result<(), GenerateError> {
        log(ctx, "Right")?;
        self.value = parents.get::<Base>()?.value * 2;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Top {
    pub sum: u32,
}

#[async_trait]
impl Asset for Top {
    const KEY: AssetKey = AssetKey::new("test.Top");

    fn name(&self) -> &'static str {
        "Top"
    }

    fn dependencies(&self) -> Vec<AssetKey> {
        vec![Left::KEY, Right::KEY]
    }

    async fn generate(&mut self, parents: &Parents, ctx: &GenerateContext) -> Result<(), GenerateError> {
        log(ctx, "Top")?;
        self.sum = parents.get::<Left>()?.value + parents.get::<Right>()?.value;
        Ok(())
    }
}

impl WritableAsset for Top {
    fn files(&self) -> Vec<AssetFile> {
        vec![AssetFile::new("top.txt", self.sum.to_string())]
    }

    fn load(&mut self, fetcher: &dyn FileFetcher) -> Result<bool, LoadError> {
        let Some(file) = fetcher.fetch_by_name("top.txt")? else {
            return Ok(false);
        };
        let text = file.as_str().ok_or_else(|| LoadError::parse("top.txt", "not utf-8"))?;
        self.sum = text.trim().parse().map_err(|e| LoadError::parse("top.txt", e))?;
        Ok(true)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Failing;

#[async_trait]
impl Asset for Failing {
    const KEY: AssetKey = AssetKey::new("test.Failing");

    fn name(&self) -> &'static str {
        "Failing"
    }

    fn dependencies(&self) -> Vec<AssetKey> {
        vec![Base::KEY]
    }

    async fn generate(&mut self, _: &Parents, ctx: &GenerateContext) -> Result<(), GenerateError> {
        log(ctx, "Failing")?;
        Err(ValidationError::new("failing.value", "always rejected").into())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NeedsFailing;

#[async_trait]
impl Asset for NeedsFailing {
    const KEY: AssetKey = AssetKey::new("test.NeedsFailing");

    fn name(&self) -> &'static str {
        "NeedsFailing"
    }

    fn dependencies(&self) -> Vec<AssetKey> {
        vec![Left::KEY, Failing::KEY]
    }

    async fn generate(&mut self, _: &Parents, ctx: &GenerateContext) -> Result<(), GenerateError> {
        log(ctx, "NeedsFailing")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CycleA;

#[async_trait]
impl Asset for CycleA {
    const KEY: AssetKey = AssetKey::new("test.CycleA");

    fn name(&self) -> &'static str {
        "CycleA"
    }

    fn dependencies(&self) -> Vec<AssetKey> {
        vec![CycleB::KEY]
    }

    async fn generate(&mut self, _: &Parents, ctx: &GenerateContext) -> Result<(), GenerateError> {
        log(ctx, "CycleA")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CycleB;

#[async_trait]
impl Asset for CycleB {
    const KEY: AssetKey = AssetKey::new("test.CycleB");

    fn name(&self) -> &'static str {
        "CycleB"
    }

    fn dependencies(&self) -> Vec<AssetKey> {
        vec![CycleA::KEY]
    }

    async fn generate(&mut self, _: &Parents, ctx: &GenerateContext) -> Result<(), GenerateError> {
        log(ctx, "CycleB")
    }
}

/// Never finishes generating
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Stalled;

#[async_trait]
impl Asset for Stalled {
    const KEY: AssetKey = AssetKey::new("test.Stalled");

    fn name(&self) -> &'static str {
        "Stalled"
    }

    async fn generate(&mut self, _: &Parents, _: &GenerateContext) -> Result<(), GenerateError> {
        std::future::pending::<()>().await;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Interruptible {
    pub done: bool,
}

#[async_trait]
impl Asset for Interruptible {
    const KEY: AssetKey = AssetKey::new("test.Interruptible");

    fn name(&self) -> &'static str {
        "Interruptible"
    }

    async fn generate(&mut self, _: &Parents, ctx: &GenerateContext) -> Result<(), GenerateError> {
        if ctx.service::<Arc<Interrupt>>()?.0.load(Ordering::SeqCst) {
            return Err(GenerateError::Cancelled);
        }
        log(ctx, "Interruptible")?;
        self.done = true;
        Ok(())
    }
}

/// Takes a while, so concurrent requests overlap
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Slow {
    pub value: u32,
}

#[async_trait]
impl Asset for Slow {
    const KEY: AssetKey = AssetKey::new("test.Slow");

    fn name(&self) -> &'static str {
        "Slow"
    }

    fn dependencies(&self) -> Vec<AssetKey> {
        vec![Base::KEY]
    }

    async fn generate(&mut self, parents: &Parents, ctx: &GenerateContext) -> Result<(), GenerateError> {
        tokio::time::sleep(Duration::from_millis(50)).await;
        log(ctx, "Slow")?;
        self.value = parents.get::<Base>()?.value;
        Ok(())
    }
}

/// Cycle entered only after a slow prerequisite
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SlowCycleHead;

#[async_trait]
impl Asset for SlowCycleHead {
    const KEY: AssetKey = AssetKey::new("test.SlowCycleHead");

    fn name(&self) -> &'static str {
        "SlowCycleHead"
    }

    fn dependencies(&self) -> Vec<AssetKey> {
        vec![Slow::KEY, SlowCycleTail::KEY]
    }

    async fn generate(&mut self, _: &Parents, ctx: &GenerateContext) -> Result<(), GenerateError> {
        log(ctx, "SlowCycleHead")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SlowCycleTail;

#[async_trait]
impl Asset for SlowCycleTail {
    const KEY: AssetKey = AssetKey::new("test.SlowCycleTail");

    fn name(&self) -> &'static str {
        "SlowCycleTail"
    }

    fn dependencies(&self) -> Vec<AssetKey> {
        vec![SlowCycleHead::KEY]
    }

    async fn generate(&mut self, _: &Parents, ctx: &GenerateContext) -> Result<(), GenerateError> {
        log(ctx, "SlowCycleTail")
    }
}

pub fn registry() -> Arc<Registry> {
    let mut registry = Registry::new();
    registry
        .register::<Base>()
        .register::<Left>()
        .register::<Right>()
        .register_writable::<Top>()
        .register::<Failing>()
        .register::<NeedsFailing>()
        .register::<CycleA>()
        .register::<CycleB>()
        .register::<Stalled>()
        .register::<Interruptible>()
        .register::<Slow>()
        .register::<SlowCycleHead>()
        .register::<SlowCycleTail>();
    Arc::new(registry)
}

/// Services with a fresh generation log, returned for inspection
pub fn services() -> (Services, Arc<GenerationLog>, Arc<Interrupt>) {
    let log = Arc::new(GenerationLog::default());
    let interrupt = Arc::new(Interrupt::default());
    let services = Services::new()
        .with(Arc::clone(&log))
        .with(Arc::clone(&interrupt));
    (services, log, interrupt)
}
