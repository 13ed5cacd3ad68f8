use std::{cell::RefCell, io, rc::Rc};

use cultivation_adventure::adventure::sect::{BattleOutcome, BattleResolver};
use cultivation_adventure::adventure::session::category_label;
use cultivation_adventure::adventure::state::{ItemType, Notice, NoticeKind, PlayerState, Tone};
use cultivation_adventure::adventure::templates::{EventCategory, RiskLevel};
use cultivation_adventure::adventure::{AdventureEngine, AdventureRequest, AdventureSession};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use ratzilla::event::KeyCode;
use ratzilla::ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratzilla::ratatui::style::{Color, Modifier, Style};
use ratzilla::ratatui::text::{Line, Span};
use ratzilla::ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratzilla::ratatui::{Frame, Terminal};
use ratzilla::{DomBackend, WebRenderer};

/// Quick skirmish arithmetic for the browser host.
struct Skirmish {
    rng: StdRng,
    sect_ids: Vec<String>,
}

impl BattleResolver for Skirmish {
    fn resolve(
        &mut self,
        player: &PlayerState,
        _category: EventCategory,
        risk: Option<RiskLevel>,
        boss_id: Option<&str>,
    ) -> BattleOutcome {
        let danger = match (boss_id, risk) {
            (Some(_), _) => 4.0,
            (None, Some(r)) => r.hp_cost_scale(),
            (None, None) => 1.0,
        };
        let power = (player.attack + player.defense + player.speed).max(1) as f64;
        let enemy = power * self.rng.gen_range(0.6..1.3) * danger.sqrt();
        let victory = power >= enemy;
        let scale = player.realm.base_multiplier();
        let wound = ((enemy * 0.4).round() as i64).max(1);

        let opponent_sect = if boss_id.is_none() && self.rng.gen_bool(0.2) {
            let pick = self.rng.gen_range(0..self.sect_ids.len().max(1));
            self.sect_ids.get(pick).cloned()
        } else {
            None
        };
        let summary = match (victory, &opponent_sect) {
            (true, Some(_)) => "You cut down a sect disciple who waylaid you.",
            (true, None) => "You defeated your opponent.",
            (false, _) => "You were beaten and fled.",
        };
        BattleOutcome {
            victory,
            hp_loss: if victory { wound / 2 } else { wound },
            exp_change: if victory { (20.0 * scale * danger) as i64 } else { 0 },
            spirit_stones_change: if victory { (10.0 * scale * danger) as i64 } else { 0 },
            summary: summary.to_string(),
            opponent_sect,
            ..BattleOutcome::default()
        }
    }
}

struct App {
    session: AdventureSession,
    rng: StdRng,
    battle: Skirmish,
    /// Category [A] turns on.
    last_category: EventCategory,
    /// Most recent notice, shown next to the title.
    banner: Option<Notice>,
}

fn now_ms() -> u64 {
    js_sys::Date::now() as u64
}

impl App {
    fn handle_key(&mut self, c: char) {
        let now = now_ms();
        let App {
            session,
            rng,
            battle,
            last_category,
            ..
        } = self;

        if session.pending_choice().is_some() {
            if let Some(index) = c.to_digit(10).and_then(|d| d.checked_sub(1)) {
                if let Err(e) = session.choose_reputation(index as usize) {
                    web_sys::console::warn_1(&e.to_string().into());
                }
            }
            return;
        }

        match c {
            '1' | '2' | '3' | '4' => {
                let category = match c {
                    '1' => EventCategory::Normal,
                    '2' => EventCategory::Lucky,
                    '3' => EventCategory::SecretRealm,
                    _ => EventCategory::SectChallenge,
                };
                *last_category = category;
                session.adventure(AdventureRequest::new(category), battle, rng, now);
            }
            'a' => {
                let next = match session.auto_category() {
                    Some(_) => None,
                    None => Some(*last_category),
                };
                session.set_auto(next);
            }
            'y' => {
                session.confirm_boss(true, battle, rng, now);
            }
            'n' => {
                session.confirm_boss(false, battle, rng, now);
            }
            'h' => {
                session.toggle_auto_harvest();
            }
            'c' => {
                session.harvest_now(now);
            }
            'p' => {
                let herb = session
                    .state()
                    .inventory
                    .iter()
                    .find(|i| i.item_type == ItemType::Herb)
                    .map(|i| i.name.clone());
                if let Some(name) = herb {
                    session.plant(&name, now);
                }
            }
            _ => {}
        }
    }

    /// Per-frame work: pacing, auto-adventure, auto-harvest.
    fn frame(&mut self) {
        let now = now_ms();
        let App {
            session,
            rng,
            battle,
            banner,
            ..
        } = self;
        session.tick(now);
        session.poll_auto(battle, rng, now);
        session.poll_harvest(now);
        if let Some(latest) = session.take_notices().pop() {
            *banner = Some(latest);
        }
    }
}

fn main() -> io::Result<()> {
    console_error_panic_hook::set_once();

    let engine = AdventureEngine::builtin()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    let sect_ids = engine.catalog().sects().iter().map(|s| s.id.clone()).collect();
    let session = AdventureSession::new(engine, PlayerState::new("Wanderer")).with_pacing(true);
    let app = Rc::new(RefCell::new(App {
        session,
        rng: StdRng::from_entropy(),
        battle: Skirmish {
            rng: StdRng::from_entropy(),
            sect_ids,
        },
        last_category: EventCategory::Normal,
        banner: None,
    }));

    let backend = DomBackend::new()?;
    let mut terminal = Terminal::new(backend)?;

    terminal.on_key_event({
        let app = app.clone();
        move |key_event| {
            if let KeyCode::Char(c) = key_event.code {
                app.borrow_mut().handle_key(c.to_ascii_lowercase());
            }
        }
    });

    terminal.draw_web(move |f| {
        let mut app = app.borrow_mut();
        app.frame();

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Length(8),
                Constraint::Min(5),
                Constraint::Length(3),
            ])
            .split(f.area());

        render_title(f, app.banner.as_ref(), chunks[0]);
        render_status(f, &app.session, chunks[1]);
        render_log(f, &app.session, chunks[2]);
        render_help(f, &app.session, chunks[3]);
    });

    Ok(())
}

fn notice_color(kind: NoticeKind) -> Color {
    match kind {
        NoticeKind::Danger => Color::Red,
        NoticeKind::RealmLevelUp | NoticeKind::RuleUnlocked => Color::Magenta,
        NoticeKind::ArtUnlocked => Color::Yellow,
        NoticeKind::ItemObtained | NoticeKind::PetObtained | NoticeKind::PetEvolved => Color::Green,
    }
}

fn render_title(f: &mut Frame, banner: Option<&Notice>, area: Rect) {
    let mut spans = vec![Span::styled(
        "Path of Cultivation",
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
    )];
    if let Some(notice) = banner {
        spans.push(Span::styled("  |  ", Style::default().fg(Color::DarkGray)));
        spans.push(Span::styled(
            notice.text.as_str(),
            Style::default().fg(notice_color(notice.kind)),
        ));
    }
    let title = Paragraph::new(Line::from(spans))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray)),
    )
    .alignment(Alignment::Center);
    f.render_widget(title, area);
}

fn render_status(f: &mut Frame, session: &AdventureSession, area: Rect) {
    let s = session.state();
    let max_hp = session.engine().actual_max_hp(s);
    let label = Style::default().fg(Color::DarkGray);
    let value = Style::default().fg(Color::White);

    let sect = match (&s.sect, &s.hunt) {
        (_, Some(h)) => format!("hunted by {} (level {})", h.sect_id, h.level),
        (Some(m), None) => format!("{} ({:?})", m.sect_id, m.rank),
        (None, None) => "none".to_string(),
    };
    let auto = match session.auto_category() {
        Some(_) if session.is_auto_paused() => "paused".to_string(),
        Some(c) => category_label(c).to_string(),
        None => "off".to_string(),
    };

    let lines = vec![
        Line::from(vec![
            Span::styled("Realm ", label),
            Span::styled(format!("{} {}", s.realm.name(), s.realm_level), value),
            Span::styled("   HP ", label),
            Span::styled(format!("{}/{}", s.hp, max_hp), Style::default().fg(Color::Red)),
        ]),
        Line::from(vec![
            Span::styled("Exp ", label),
            Span::styled(s.exp.to_string(), value),
            Span::styled("   Spirit stones ", label),
            Span::styled(s.spirit_stones.to_string(), Style::default().fg(Color::Yellow)),
            Span::styled("   Reputation ", label),
            Span::styled(s.reputation.to_string(), value),
        ]),
        Line::from(vec![
            Span::styled("Lifespan ", label),
            Span::styled(format!("{:.1}/{:.0}", s.lifespan, s.max_lifespan), value),
            Span::styled("   Items ", label),
            Span::styled(s.inventory.len().to_string(), value),
            Span::styled("   Pets ", label),
            Span::styled(s.pets.len().to_string(), value),
        ]),
        Line::from(vec![Span::styled("Sect ", label), Span::styled(sect, value)]),
        Line::from(vec![
            Span::styled("Auto ", label),
            Span::styled(auto, value),
            Span::styled("   Auto-harvest ", label),
            Span::styled(if s.auto_harvest { "on" } else { "off" }, value),
            Span::styled("   Growing ", label),
            Span::styled(s.planted.len().to_string(), value),
        ]),
    ];

    let status = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Green))
            .title(format!(" {} ", s.name)),
    );
    f.render_widget(status, area);
}

fn tone_style(tone: Tone) -> Style {
    match tone {
        Tone::Normal => Style::default().fg(Color::Gray),
        Tone::Gain => Style::default().fg(Color::Green),
        Tone::Danger => Style::default().fg(Color::Red),
        Tone::Special => Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
    }
}

fn render_log(f: &mut Frame, session: &AdventureSession, area: Rect) {
    let log = session.log();
    let visible_height = area.height.saturating_sub(2) as usize;
    let start = log.len().saturating_sub(visible_height);

    let lines: Vec<Line> = log[start..]
        .iter()
        .map(|entry| Line::from(Span::styled(entry.text.as_str(), tone_style(entry.tone))))
        .collect();

    let widget = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Blue))
                .title(" Journal "),
        )
        .wrap(Wrap { trim: false });
    f.render_widget(widget, area);
}

fn render_help(f: &mut Frame, session: &AdventureSession, area: Rect) {
    let text = if let Some(event) = session.pending_choice() {
        let options: Vec<String> = event
            .choices
            .iter()
            .enumerate()
            .map(|(i, c)| format!("[{}] {}", i + 1, c.text))
            .collect();
        format!("{}: {}", event.title, options.join("  "))
    } else if session.pending_boss().is_some() {
        "[Y] Fight the boss  [N] Slip away".to_string()
    } else if session.is_loading() {
        "...".to_string()
    } else {
        "[1] Wander [2] Fortune [3] Secret Realm [4] Sect  [A] Auto  [P] Plant [C] Collect [H] Auto-harvest"
            .to_string()
    };
    let help = Paragraph::new(Line::from(Span::styled(
        text,
        Style::default().fg(Color::DarkGray),
    )))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray)),
    )
    .alignment(Alignment::Center);
    f.render_widget(help, area);
}
