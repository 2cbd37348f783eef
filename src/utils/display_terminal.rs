//! 부트스트랩 진행 상황 터미널 출력
//!
//! 컨테이너 구성 단계(프로바이더 적용, 공유 서비스 생성)와 최종 요약을 출력합니다.
//! 각 출력 함수는 문자열을 만드는 함수와 짝을 이루며, 문자열 쪽은 테스트에서 사용됩니다.
//!
//! ```text
//! ╔══════════════════════════════════════════════════╗
//! ║       🔄 BOOTSTRAPPING SERVICE CONTAINER        ║
//! ╚══════════════════════════════════════════════════╝
//! → Step 1: Applying service providers
//!    ├─ core: ✓ Registered
//! ✓ Step 1: Service providers applied (1 items)
//! ```

/// 박스 내부 폭
const BOX_WIDTH: usize = 50;

pub fn boxed_title(title: &str) -> String {
    let border = "═".repeat(BOX_WIDTH);
    format!("╔{border}╗\n║{:^width$}║\n╚{border}╝", title, width = BOX_WIDTH - 1)
}

/// 박스 형태의 제목 출력
pub fn print_boxed_title(title: &str) {
    println!("{}", boxed_title(title));
}

pub fn print_step_start(step: u8, description: &str) {
    println!("→ Step {}: {}", step, description);
}

pub fn step_complete_line(step: u8, description: &str, count: usize) -> String {
    format!("✓ Step {}: {} ({} items)", step, description, count)
}

/// 단계 완료와 처리된 항목 수 출력
pub fn print_step_complete(step: u8, description: &str, count: usize) {
    println!("{}", step_complete_line(step, description, count));
}

pub fn sub_task_line(name: &str, status: &str) -> String {
    format!("   ├─ {}: {}", name, status)
}

/// 하위 작업(프로바이더, 서비스) 상태 출력
pub fn print_sub_task(name: &str, status: &str) {
    println!("{}", sub_task_line(name, status));
}

pub fn final_summary(providers: usize, services: usize) -> String {
    format!(
        "{}\n   🧩 Providers: {}\n   🔧 Shared services: {}",
        boxed_title("🎉 SERVICE CONTAINER READY"),
        providers,
        services
    )
}

/// 컨테이너 준비 완료 요약
///
/// * `providers` - 적용된 프로바이더 수
/// * `services` - 미리 생성된 공유 서비스 수
pub fn print_final_summary(providers: usize, services: usize) {
    println!();
    println!("{}", final_summary(providers, services));
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boxed_title_lines_have_equal_width() {
        let title = boxed_title("READY");
        let widths: Vec<usize> = title.lines().map(|line| line.chars().count()).collect();

        assert_eq!(widths.len(), 3);
        assert_eq!(widths[0], BOX_WIDTH + 2);
        assert_eq!(widths[1], BOX_WIDTH + 1);
    }

    #[test]
    fn test_summary_lines() {
        assert_eq!(sub_task_line("cache", "✓ Created"), "   ├─ cache: ✓ Created");
        assert_eq!(step_complete_line(2, "Shared services created", 11), "✓ Step 2: Shared services created (11 items)");
        assert!(final_summary(2, 11).contains("Providers: 2"));
    }
}
