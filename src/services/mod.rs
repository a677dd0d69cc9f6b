/// Service orchestration
///
/// Every long-running part of the gateway implements `Service` and is
/// driven by the `ServiceManager`: registration, dependency-ordered
/// startup, and reverse-order shutdown with a bounded wait per task.
pub mod implementations;

use crate::config::Config;
use crate::logger::{self, LogTag};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

/// Core service trait that all services must implement
#[async_trait]
pub trait Service: Send + Sync {
    /// Unique service identifier
    fn name(&self) -> &'static str;

    /// Service priority (lower = starts earlier, stops later)
    fn priority(&self) -> i32 {
        100
    }

    /// Services this service depends on
    fn dependencies(&self) -> Vec<&'static str> {
        vec![]
    }

    /// Check if service is enabled in configuration
    fn is_enabled(&self, _config: &Config) -> bool {
        true
    }

    /// One-time setup before start
    async fn initialize(&mut self) -> Result<(), String> {
        Ok(())
    }

    /// Start the service, returning its background task handles
    async fn start(&mut self, shutdown: Arc<Notify>) -> Result<Vec<JoinHandle<()>>, String>;

    /// Stop the service
    async fn stop(&mut self) -> Result<(), String> {
        Ok(())
    }
}

pub struct ServiceManager {
    services: HashMap<&'static str, Box<dyn Service>>,
    handles: HashMap<&'static str, Vec<JoinHandle<()>>>,
    shutdown: Arc<Notify>,
    config: Config,
}

impl ServiceManager {
    pub fn new(config: Config) -> Self {
        Self {
            services: HashMap::new(),
            handles: HashMap::new(),
            shutdown: Arc::new(Notify::new()),
            config,
        }
    }

    /// Register a service
    pub fn register(&mut self, service: Box<dyn Service>) {
        let name = service.name();
        self.services.insert(name, service);
    }

    /// Start all enabled services in dependency and priority order
    pub async fn start_all(&mut self) -> Result<(), String> {
        logger::info(LogTag::System, "Starting services...");

        let enabled: Vec<&'static str> = self
            .services
            .iter()
            .filter(|(_, service)| service.is_enabled(&self.config))
            .map(|(name, _)| *name)
            .collect();

        logger::info(
            LogTag::System,
            &format!("Enabled services: {:?}", enabled),
        );

        let ordered = self.resolve_startup_order(&enabled)?;

        logger::info(
            LogTag::System,
            &format!("Service startup order: {:?}", ordered),
        );

        for service_name in ordered {
            if let Some(service) = self.services.get_mut(service_name) {
                logger::debug(
                    LogTag::System,
                    &format!("Initializing service: {}", service_name),
                );
                service.initialize().await?;

                let handles = service.start(self.shutdown.clone()).await?;
                self.handles.insert(service_name, handles);

                logger::info(
                    LogTag::System,
                    &format!("✅ Service started: {}", service_name),
                );
            }
        }

        logger::info(LogTag::System, "✅ All services started");
        Ok(())
    }

    /// Stop all services in reverse startup order
    pub async fn stop_all(&mut self) -> Result<(), String> {
        logger::info(LogTag::System, "Stopping services...");

        self.shutdown.notify_waiters();

        let running: Vec<&'static str> = self.handles.keys().copied().collect();
        let mut ordered = self.resolve_startup_order(&running)?;
        ordered.reverse();

        for service_name in ordered {
            if let Some(service) = self.services.get_mut(service_name) {
                if let Err(e) = service.stop().await {
                    logger::warning(
                        LogTag::System,
                        &format!("Service stop error for {}: {}", service_name, e),
                    );
                }

                if let Some(handles) = self.handles.remove(service_name) {
                    for handle in handles {
                        let _ = tokio::time::timeout(
                            tokio::time::Duration::from_secs(5),
                            handle,
                        )
                        .await;
                    }
                }

                logger::info(
                    LogTag::System,
                    &format!("✅ Service stopped: {}", service_name),
                );
            }
        }

        logger::info(LogTag::System, "✅ All services stopped");
        Ok(())
    }

    /// Resolve startup order: dependency visit first, then priority sort
    fn resolve_startup_order(
        &self,
        services: &[&'static str],
    ) -> Result<Vec<&'static str>, String> {
        use std::collections::HashSet;

        let mut ordered = Vec::new();
        let mut visited = HashSet::new();
        let mut visiting = HashSet::new();

        fn visit(
            name: &'static str,
            services: &HashMap<&'static str, Box<dyn Service>>,
            ordered: &mut Vec<&'static str>,
            visited: &mut HashSet<&'static str>,
            visiting: &mut HashSet<&'static str>,
        ) -> Result<(), String> {
            if visited.contains(name) {
                return Ok(());
            }

            if visiting.contains(name) {
                return Err(format!("Circular dependency detected for service: {}", name));
            }

            visiting.insert(name);

            if let Some(service) = services.get(name) {
                for dep in service.dependencies() {
                    visit(dep, services, ordered, visited, visiting)?;
                }
            }

            visiting.remove(name);
            visited.insert(name);
            ordered.push(name);

            Ok(())
        }

        for &service_name in services {
            visit(
                service_name,
                &self.services,
                &mut ordered,
                &mut visited,
                &mut visiting,
            )?;
        }

        ordered.sort_by_key(|name| {
            self.services
                .get(name)
                .map(|s| s.priority())
                .unwrap_or(100)
        });

        Ok(ordered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct RecordingService {
        name: &'static str,
        priority: i32,
        deps: Vec<&'static str>,
        enabled: bool,
        log: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl Service for RecordingService {
        fn name(&self) -> &'static str {
            self.name
        }

        fn priority(&self) -> i32 {
            self.priority
        }

        fn dependencies(&self) -> Vec<&'static str> {
            self.deps.clone()
        }

        fn is_enabled(&self, _config: &Config) -> bool {
            self.enabled
        }

        async fn start(
            &mut self,
            shutdown: Arc<Notify>,
        ) -> Result<Vec<JoinHandle<()>>, String> {
            self.log.lock().unwrap().push(format!("start:{}", self.name));
            let handle = tokio::spawn(async move {
                shutdown.notified().await;
            });
            Ok(vec![handle])
        }

        async fn stop(&mut self) -> Result<(), String> {
            self.log.lock().unwrap().push(format!("stop:{}", self.name));
            Ok(())
        }
    }

    fn recording(
        name: &'static str,
        priority: i32,
        deps: Vec<&'static str>,
        log: &Arc<Mutex<Vec<String>>>,
    ) -> Box<RecordingService> {
        Box::new(RecordingService {
            name,
            priority,
            deps,
            enabled: true,
            log: log.clone(),
        })
    }

    #[tokio::test]
    async fn test_start_and_stop_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut manager = ServiceManager::new(Config::default());
        manager.register(recording("delivery", 20, vec!["storage"], &log));
        manager.register(recording("storage", 5, vec![], &log));
        manager.register(recording("cleanup", 30, vec!["storage"], &log));

        manager.start_all().await.unwrap();
        manager.stop_all().await.unwrap();

        let events = log.lock().unwrap().clone();
        assert_eq!(
            events,
            vec![
                "start:storage",
                "start:delivery",
                "start:cleanup",
                "stop:cleanup",
                "stop:delivery",
                "stop:storage",
            ]
        );
    }

    #[tokio::test]
    async fn test_disabled_service_is_skipped() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut manager = ServiceManager::new(Config::default());
        manager.register(recording("storage", 5, vec![], &log));
        manager.register(Box::new(RecordingService {
            name: "cleanup",
            priority: 30,
            deps: vec![],
            enabled: false,
            log: log.clone(),
        }));

        manager.start_all().await.unwrap();
        manager.stop_all().await.unwrap();

        let events = log.lock().unwrap().clone();
        assert!(events.contains(&"start:storage".to_string()));
        assert!(!events.iter().any(|e| e == "start:cleanup"));
    }

    #[tokio::test]
    async fn test_circular_dependency_is_rejected() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut manager = ServiceManager::new(Config::default());
        manager.register(recording("a", 10, vec!["b"], &log));
        manager.register(recording("b", 20, vec!["a"], &log));

        let err = manager.start_all().await.unwrap_err();
        assert!(err.contains("Circular dependency"));
    }
}
