//! # Service Container - 지연 생성 싱글톤 의존성 주입 시스템
//!
//! 이름으로 식별되는 서비스를 팩토리 함수로 등록하고, 첫 요청 시점에
//! 한 번만 생성하여 이후에는 동일한 인스턴스를 돌려주는 DI 컨테이너입니다.
//! 전역 로케이터 대신 컨테이너 핸들을 명시적으로 전달하며,
//! 팩토리는 컨테이너를 인자로 받아 다른 서비스를 해석합니다.
//!
//! ## 주요 구성 요소
//!
//! ### ServiceContainer
//! - **지연 초기화**: 첫 `resolve` 시점에 팩토리 실행
//! - **싱글톤 보장**: 엔트리마다 `OnceCell`을 두어 동시 첫 접근에서도 팩토리는 한 번만 실행
//! - **실패 비캐싱**: 팩토리가 실패하면 아무것도 캐시하지 않고, 다음 요청에서 다시 시도
//! - **확장(extend)**: 기존 팩토리 결과를 감싸는 새 팩토리 체인으로 교체
//! - **순환 참조 감지**: 같은 스레드에서 생성 중인 서비스를 다시 요청하면 에러
//!
//! ### ServiceProvider (Component Scanning)
//! - **inventory 기반**: `inventory::submit!`으로 등록된 프로바이더를 우선순위 순서로 적용
//! - **레이어링**: 나중에 적용된 프로바이더가 앞선 등록을 덮어쓰거나 `extend`로 확장
//!
//! ## 동작 원리
//!
//! ```text
//! 1. 등록 단계 (Startup)
//!    ├─ ProviderRegistration 수집 (inventory::iter)
//!    ├─ priority 오름차순 정렬
//!    └─ provider.register(&container) → register / extend 호출
//!
//! 2. 해석 단계 (Runtime)
//!    ├─ 엔트리 조회 → 없으면 UnknownService
//!    ├─ 캐시 확인 → 있으면 동일 Arc 반환
//!    ├─ 순환 참조 검사 (스레드 로컬 해석 스택)
//!    └─ OnceCell::get_or_try_init → 팩토리 실행 및 캐싱
//! ```
//!
//! ## 사용 예제
//!
//! ```rust,ignore
//! use service_bootstrap::core::registry::ServiceContainer;
//!
//! let container = ServiceContainer::new();
//! container.register("config", |_| Ok(ConfigRepository::from_env()));
//! container.register("cache", |c| {
//!     let config = c.get::<ConfigRepository>("config")?;
//!     Cache::from_config(&config)
//! });
//!
//! let cache = container.get::<Cache>("cache")?;
//! ```

use std::any::{Any, type_name};
use std::cell::RefCell;
use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, PoisonError, RwLock};

use log::{debug, error, info};
use once_cell::sync::OnceCell;

use crate::core::errors::{AppError, AppResult};
use crate::utils::display_terminal::{
    print_boxed_title, print_final_summary, print_step_complete, print_step_start, print_sub_task,
};

/// 컨테이너에 저장되는 타입 소거된 인스턴스
pub type Instance = Arc<dyn Any + Send + Sync>;

/// 컨테이너 핸들을 받아 인스턴스를 만드는 타입 소거된 팩토리
type Factory = Arc<dyn Fn(&ServiceContainer) -> AppResult<Instance> + Send + Sync>;

/// 서비스 등록 정보와 캐시된 인스턴스
struct ServiceEntry {
    /// 현재 팩토리 (extend 시 교체됨)
    factory: RwLock<Factory>,
    /// 공유 서비스의 캐시. 실패한 생성은 저장되지 않습니다.
    instance: OnceCell<Instance>,
    /// false이면 resolve마다 새 인스턴스를 생성
    shared: bool,
}

impl ServiceEntry {
    fn new(factory: Factory, shared: bool) -> Self {
        Self {
            factory: RwLock::new(factory),
            instance: OnceCell::new(),
            shared,
        }
    }

    fn current_factory(&self) -> Factory {
        self.factory
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

thread_local! {
    /// 현재 스레드에서 생성 중인 (컨테이너 주소, 서비스 이름) 스택
    static RESOLVING: RefCell<Vec<(usize, String)>> = const { RefCell::new(Vec::new()) };
}

/// 해석 스택에 이름을 올리고, drop 시 내립니다.
struct ResolutionGuard {
    key: (usize, String),
}

impl ResolutionGuard {
    fn enter(container: &ServiceContainer, name: &str) -> AppResult<Self> {
        let key = (container as *const ServiceContainer as usize, name.to_string());

        RESOLVING.with(|stack| {
            let mut stack = stack.borrow_mut();
            if stack.contains(&key) {
                let chain: Vec<&str> = stack
                    .iter()
                    .filter(|(owner, _)| *owner == key.0)
                    .map(|(_, name)| name.as_str())
                    .chain(std::iter::once(name))
                    .collect();
                return Err(AppError::CircularDependency(chain.join(" -> ")));
            }
            stack.push(key.clone());
            Ok(())
        })?;

        Ok(Self { key })
    }
}

impl Drop for ResolutionGuard {
    fn drop(&mut self) {
        RESOLVING.with(|stack| {
            let mut stack = stack.borrow_mut();
            if let Some(pos) = stack.iter().rposition(|entry| *entry == self.key) {
                stack.remove(pos);
            }
        });
    }
}

/// 이름 기반 지연 생성 서비스 컨테이너
///
/// 등록, 확장, 해석 모두 `&self`로 동작하므로 팩토리 내부에서도
/// 같은 컨테이너를 통해 다른 서비스를 해석할 수 있습니다.
pub struct ServiceContainer {
    entries: RwLock<HashMap<String, Arc<ServiceEntry>>>,
}

impl Default for ServiceContainer {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceContainer {
    /// 비어 있는 컨테이너를 생성합니다.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// 공유(싱글톤) 서비스를 등록합니다.
    ///
    /// 같은 이름으로 다시 등록하면 이전 등록과 캐시를 모두 대체합니다.
    pub fn register<T, F>(&self, name: &str, factory: F)
    where
        T: Send + Sync + 'static,
        F: Fn(&ServiceContainer) -> AppResult<T> + Send + Sync + 'static,
    {
        self.insert(name, Self::erase(factory), true);
    }

    /// 매 해석마다 새 인스턴스를 만드는 비공유 서비스를 등록합니다.
    pub fn register_factory<T, F>(&self, name: &str, factory: F)
    where
        T: Send + Sync + 'static,
        F: Fn(&ServiceContainer) -> AppResult<T> + Send + Sync + 'static,
    {
        self.insert(name, Self::erase(factory), false);
    }

    /// 이미 생성된 인스턴스를 직접 등록합니다.
    pub fn instance<T: Send + Sync + 'static>(&self, name: &str, value: Arc<T>) {
        let stored: Instance = value;
        let cached = stored.clone();
        let entry = ServiceEntry::new(Arc::new(move |_: &ServiceContainer| Ok(stored.clone())), true);
        let _ = entry.instance.set(cached);

        debug!("📦 Registering instance: {}", name);
        self.write_entries().insert(name.to_string(), Arc::new(entry));
    }

    /// 등록된 서비스의 팩토리를 확장합니다.
    ///
    /// 새 팩토리는 이전 팩토리의 결과를 먼저 해석한 뒤 `wrapper`에 넘깁니다.
    /// 별도 엔트리를 만들지 않고 같은 엔트리의 팩토리 체인을 교체합니다.
    ///
    /// # Errors
    ///
    /// - `UnknownService`: 등록되지 않은 이름
    /// - `FrozenService`: 이미 인스턴스가 생성된 공유 서비스
    pub fn extend<T, F>(&self, name: &str, wrapper: F) -> AppResult<()>
    where
        T: Send + Sync + 'static,
        F: Fn(Arc<T>, &ServiceContainer) -> AppResult<Arc<T>> + Send + Sync + 'static,
    {
        let entry = self.entry(name)?;
        if entry.instance.get().is_some() {
            return Err(AppError::FrozenService(name.to_string()));
        }

        let mut slot = entry.factory.write().unwrap_or_else(PoisonError::into_inner);
        let previous = slot.clone();
        let service_name = name.to_string();

        *slot = Arc::new(move |container: &ServiceContainer| {
            let original = previous(container)?;
            let typed = downcast::<T>(&service_name, original)?;
            let wrapped: Instance = wrapper(typed, container)?;
            Ok(wrapped)
        });

        debug!("🔧 Extended service: {}", name);
        Ok(())
    }

    /// 서비스를 해석합니다.
    ///
    /// 공유 서비스는 첫 호출에서만 팩토리를 실행하고 이후에는 같은 `Arc`를 반환합니다.
    /// 팩토리가 실패하면 에러를 그대로 전파하며 캐시하지 않습니다.
    /// 팩토리 패닉은 `ServiceConstruction` 에러로 바뀝니다.
    pub fn resolve(&self, name: &str) -> AppResult<Instance> {
        let entry = self.entry(name)?;

        if let Some(instance) = entry.instance.get() {
            return Ok(instance.clone());
        }

        let _guard = ResolutionGuard::enter(self, name)?;

        if !entry.shared {
            return self.run_factory(name, entry.current_factory());
        }

        entry
            .instance
            .get_or_try_init(|| {
                debug!("Creating service instance: {}", name);
                self.run_factory(name, entry.current_factory())
            })
            .cloned()
    }

    fn run_factory(&self, name: &str, factory: Factory) -> AppResult<Instance> {
        catch_unwind(AssertUnwindSafe(|| factory(self))).unwrap_or_else(|payload| {
            let reason = payload
                .downcast_ref::<&str>()
                .map(|message| message.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "factory panicked".to_string());

            error!("❌ Service factory for '{}' panicked: {}", name, reason);
            Err(AppError::ServiceConstruction {
                name: name.to_string(),
                reason,
            })
        })
    }

    /// 서비스를 해석하고 요청한 구체 타입으로 다운캐스트합니다.
    pub fn get<T: Send + Sync + 'static>(&self, name: &str) -> AppResult<Arc<T>> {
        downcast::<T>(name, self.resolve(name)?)
    }

    /// 서비스 등록 여부를 반환합니다.
    pub fn has(&self, name: &str) -> bool {
        self.read_entries().contains_key(name)
    }

    /// 캐시된 인스턴스를 버립니다. 다음 해석에서 현재 팩토리가 다시 실행됩니다.
    pub fn reset(&self, name: &str) -> AppResult<()> {
        let mut entries = self.write_entries();
        let entry = entries
            .get(name)
            .ok_or_else(|| AppError::UnknownService(name.to_string()))?;

        let fresh = ServiceEntry::new(entry.current_factory(), entry.shared);
        entries.insert(name.to_string(), Arc::new(fresh));
        Ok(())
    }

    /// 등록된 서비스 이름 목록 (정렬됨)
    pub fn service_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.read_entries().keys().cloned().collect();
        names.sort();
        names
    }

    /// 인스턴스가 이미 생성된 서비스인지 반환합니다.
    pub fn is_resolved(&self, name: &str) -> bool {
        self.read_entries()
            .get(name)
            .is_some_and(|entry| entry.instance.get().is_some())
    }

    /// 모든 공유 서비스를 미리 생성합니다.
    ///
    /// 트래픽을 받기 전에 드라이버 설정 오류 같은 구성 문제를 드러내기 위해
    /// 애플리케이션 시작 시 호출합니다. 생성된 서비스 수를 반환합니다.
    pub fn initialize_all(&self) -> AppResult<usize> {
        print_step_start(2, "Creating shared service instances");

        let shared: Vec<String> = {
            let entries = self.read_entries();
            let mut names: Vec<String> = entries
                .iter()
                .filter(|(_, entry)| entry.shared)
                .map(|(name, _)| name.clone())
                .collect();
            names.sort();
            names
        };

        for name in &shared {
            self.resolve(name)?;
            print_sub_task(name, "✓ Created");
        }

        print_step_complete(2, "Shared services created", shared.len());
        Ok(shared.len())
    }

    /// 주어진 프로바이더들을 순서대로 적용한 컨테이너를 생성합니다.
    pub fn with_providers<'a, I>(providers: I) -> AppResult<Self>
    where
        I: IntoIterator<Item = &'a dyn ServiceProvider>,
    {
        let container = Self::new();
        let mut applied = 0;

        print_step_start(1, "Applying service providers");
        for provider in providers {
            provider.register(&container)?;
            print_sub_task(provider.name(), "✓ Registered");
            applied += 1;
        }
        print_step_complete(1, "Service providers applied", applied);

        Ok(container)
    }

    /// `inventory`로 수집된 모든 프로바이더를 우선순위 순서로 적용합니다.
    pub fn discover() -> AppResult<Self> {
        print_boxed_title("🔄 BOOTSTRAPPING SERVICE CONTAINER");

        let mut registrations: Vec<&ProviderRegistration> =
            inventory::iter::<ProviderRegistration>().collect();
        registrations.sort_by_key(|registration| registration.priority);

        let container = Self::with_providers(registrations.iter().map(|r| r.provider))?;
        let services = container.initialize_all()?;

        print_final_summary(registrations.len(), services);
        info!("Service container ready with {} services", container.service_names().len());

        Ok(container)
    }

    fn erase<T, F>(factory: F) -> Factory
    where
        T: Send + Sync + 'static,
        F: Fn(&ServiceContainer) -> AppResult<T> + Send + Sync + 'static,
    {
        Arc::new(move |container: &ServiceContainer| {
            let instance: Instance = Arc::new(factory(container)?);
            Ok(instance)
        })
    }

    fn insert(&self, name: &str, factory: Factory, shared: bool) {
        debug!("📦 Registering service: {} (shared: {})", name, shared);
        self.write_entries()
            .insert(name.to_string(), Arc::new(ServiceEntry::new(factory, shared)));
    }

    fn entry(&self, name: &str) -> AppResult<Arc<ServiceEntry>> {
        self.read_entries()
            .get(name)
            .cloned()
            .ok_or_else(|| AppError::UnknownService(name.to_string()))
    }

    fn read_entries(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, Arc<ServiceEntry>>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_entries(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, Arc<ServiceEntry>>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn downcast<T: Send + Sync + 'static>(name: &str, instance: Instance) -> AppResult<Arc<T>> {
    instance.downcast::<T>().map_err(|_| AppError::TypeMismatch {
        name: name.to_string(),
        expected: type_name::<T>(),
    })
}

/// 컨테이너에 서비스를 등록하는 구성 단위
///
/// 코어와 확장 모듈은 각자 프로바이더를 두고, 나중에 적용되는 프로바이더가
/// 앞선 등록을 덮어쓰거나 `extend`로 감쌉니다.
pub trait ServiceProvider: Send + Sync {
    /// 로그와 요약 출력에 쓰이는 프로바이더 이름
    fn name(&self) -> &str;

    /// 컨테이너에 서비스를 등록합니다.
    fn register(&self, container: &ServiceContainer) -> AppResult<()>;
}

/// `inventory`로 수집되는 프로바이더 등록 정보
pub struct ProviderRegistration {
    /// 적용 순서. 낮을수록 먼저 적용됩니다.
    pub priority: i32,
    pub provider: &'static dyn ServiceProvider,
}

inventory::collect!(ProviderRegistration);
