// Line-oriented console front end: parses commands from stdin and prints UI
// updates from the application loop.

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info};

use pitchside_core::squad::assessment::{AssessmentEdit, ContractAction};
use pitchside_core::squad::formation::Formation;
use pitchside_core::squad::lineup::SlotRef;
use pitchside_core::squad::player::{Player, Recommendation};
use pitchside_core::squad::state::PlayerSummary;
use pitchside_core::squad::transfer::{RumorFilter, TransferRumor};

use crate::db::AssessmentRecord;
use crate::protocol::{SquadView, StatusFlag, UiUpdate, UserCommand};

pub const HELP: &str = "\
commands:
  show                               redraw the squad
  drag <player_id> <slot>            pick up a player (slot: s<i> starting, b<i> bench)
  hover <slot>                       move the dragged player over a slot
  drop <slot>                        drop the dragged player
  cancel                             abandon the drag
  formation <id>                     e.g. 4-4-2, 433, 3-5-2
  rate <player_id> <1-10> [vfm] [comment...]
  recommend <player_id> <keep|sell|loan|promote|bench>
  injured|captain|loan <player_id> <on|off>
  contract <player_id> <renew|expire>
  rumors [open|tracked|rumour|advanced|done|collapsed]
  track <rumor_id> <on|off>
  history <player_id>                assessments recorded this session
  reset                              start a new session (wipes saved history)
  help
  quit";

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse `s<i>` (starting) or `b<i>` (bench).
pub fn parse_slot(s: &str) -> Result<SlotRef, String> {
    let s = s.trim().to_lowercase();
    let (kind, index) = s.split_at(s.chars().next().map_or(0, |c| c.len_utf8()));
    let index: usize = index
        .parse()
        .map_err(|_| format!("bad slot '{s}': expected s<index> or b<index>"))?;
    match kind {
        "s" => Ok(SlotRef::starting(index)),
        "b" => Ok(SlotRef::bench(index)),
        _ => Err(format!("bad slot '{s}': expected s<index> or b<index>")),
    }
}

fn parse_on_off(s: &str) -> Result<bool, String> {
    match s.trim().to_lowercase().as_str() {
        "on" | "yes" | "true" => Ok(true),
        "off" | "no" | "false" => Ok(false),
        other => Err(format!("expected on/off, got '{other}'")),
    }
}

fn parse_int(s: &str, what: &str) -> Result<i32, String> {
    s.parse()
        .map_err(|_| format!("{what} must be a whole number, got '{s}'"))
}

fn arg<'a>(args: &[&'a str], i: usize, usage: &str) -> Result<&'a str, String> {
    args.get(i).copied().ok_or_else(|| format!("usage: {usage}"))
}

/// Parse one console line. `Ok(None)` for blank lines and `help`.
pub fn parse_command(line: &str) -> Result<Option<UserCommand>, String> {
    let words: Vec<&str> = line.split_whitespace().collect();
    let Some((&head, args)) = words.split_first() else {
        return Ok(None);
    };

    let cmd = match head.to_lowercase().as_str() {
        "help" | "?" => return Ok(None),
        "show" | "ls" => UserCommand::Show,
        "quit" | "exit" | "q" => UserCommand::Quit,
        "cancel" => UserCommand::Cancel,
        "drag" => {
            let usage = "drag <player_id> <slot>";
            UserCommand::Drag {
                player_id: arg(args, 0, usage)?.to_string(),
                source: parse_slot(arg(args, 1, usage)?)?,
            }
        }
        "hover" => UserCommand::Hover(parse_slot(arg(args, 0, "hover <slot>")?)?),
        "drop" => UserCommand::Drop(parse_slot(arg(args, 0, "drop <slot>")?)?),
        "formation" => {
            let id = arg(args, 0, "formation <id>")?;
            let formation =
                Formation::from_id(id).ok_or_else(|| format!("unknown formation '{id}'"))?;
            UserCommand::SetFormation(formation)
        }
        "rate" => {
            let usage = "rate <player_id> <1-10> [vfm] [comment...]";
            let player_id = arg(args, 0, usage)?.to_string();
            let rating = parse_int(arg(args, 1, usage)?, "rating")?;
            let mut edit = AssessmentEdit {
                rating: Some(rating),
                ..Default::default()
            };
            let mut rest = &args[2.min(args.len())..];
            // An optional signed integer right after the rating is value-for-money.
            if let Some(first) = rest.first() {
                if let Ok(vfm) = first.parse::<i32>() {
                    edit.value_for_money = Some(vfm);
                    rest = &rest[1..];
                }
            }
            if !rest.is_empty() {
                edit.comment = Some(rest.join(" "));
            }
            UserCommand::Rate { player_id, edit }
        }
        "recommend" => {
            let usage = "recommend <player_id> <keep|sell|loan|promote|bench>";
            let player_id = arg(args, 0, usage)?.to_string();
            let tag = arg(args, 1, usage)?;
            let recommendation = Recommendation::from_str_tag(tag)
                .ok_or_else(|| format!("unknown recommendation '{tag}'"))?;
            UserCommand::Recommend {
                player_id,
                recommendation,
            }
        }
        flag @ ("injured" | "captain" | "loan") => {
            let usage = format!("{flag} <player_id> <on|off>");
            let flag = match flag {
                "injured" => StatusFlag::Injured,
                "captain" => StatusFlag::Captain,
                _ => StatusFlag::OnLoan,
            };
            UserCommand::SetFlag {
                player_id: arg(args, 0, &usage)?.to_string(),
                flag,
                on: parse_on_off(arg(args, 1, &usage)?)?,
            }
        }
        "contract" => {
            let usage = "contract <player_id> <renew|expire>";
            let player_id = arg(args, 0, usage)?.to_string();
            let word = arg(args, 1, usage)?;
            let action = ContractAction::from_str_action(word)
                .ok_or_else(|| format!("unknown contract action '{word}'"))?;
            UserCommand::Contract { player_id, action }
        }
        "rumors" | "rumours" => match args.first() {
            Some(s) => UserCommand::Rumors(
                RumorFilter::from_str_filter(s)
                    .ok_or_else(|| format!("unknown rumor filter '{s}'"))?,
            ),
            None => UserCommand::Rumors(RumorFilter::All),
        },
        "track" => {
            let usage = "track <rumor_id> <on|off>";
            UserCommand::Track {
                rumor_id: arg(args, 0, usage)?.to_string(),
                tracked: parse_on_off(arg(args, 1, usage)?)?,
            }
        }
        "history" => UserCommand::History {
            player_id: arg(args, 0, "history <player_id>")?.to_string(),
        },
        "reset" => UserCommand::NewSession,
        other => return Err(format!("unknown command '{other}' (try 'help')")),
    };
    Ok(Some(cmd))
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn card(p: &PlayerSummary) -> String {
    let mut s = format!("#{:<2} {} ({})", p.number, p.name, p.position);
    if p.captain {
        s.push_str(" [C]");
    }
    if p.injured {
        s.push_str(" [INJ]");
    }
    if p.on_loan {
        s.push_str(" [LOAN]");
    }
    if let Some(r) = p.rating {
        s.push_str(&format!(" {r}/10"));
    }
    if let Some(rec) = p.recommendation {
        s.push_str(&format!(" <{rec}>"));
    }
    s.push_str(&format!("  id={}", p.id));
    s
}

pub fn render_squad(view: &SquadView) -> String {
    let snap = &view.snapshot;
    let mut out = format!(
        "== {} (rev {}) | budget {:.1}m | wages {:.0}k/wk ==\n",
        snap.formation, snap.revision, view.transfer_budget, view.wage_space
    );

    let dragged = snap.drag.as_ref();
    let marker = |slot: SlotRef| -> &'static str {
        match dragged {
            Some(d) if d.source == slot => "*",
            Some(d) if d.hover == Some(slot) => ">",
            _ => " ",
        }
    };

    out.push_str("starting:\n");
    for slot in &snap.starting {
        let who = slot.player.as_ref().map_or("-".to_string(), card);
        out.push_str(&format!(
            "{}s{:<2} {:<4} {}\n",
            marker(SlotRef::starting(slot.index)),
            slot.index,
            slot.role.display_str(),
            who
        ));
    }
    out.push_str("bench:\n");
    for slot in &snap.bench {
        let who = slot.player.as_ref().map_or("-".to_string(), card);
        out.push_str(&format!(
            "{}b{:<2} {}\n",
            marker(SlotRef::bench(slot.index)),
            slot.index,
            who
        ));
    }
    if !view.reserves.is_empty() {
        out.push_str("reserves:\n");
        for p in &view.reserves {
            out.push_str(&format!("     {}\n", card(p)));
        }
    }
    if let Some(d) = dragged {
        out.push_str(&format!("dragging {} from {}\n", d.player_id, d.source));
    }
    out
}

pub fn render_player(p: &Player) -> String {
    let mut out = format!(
        "{} | apps {} goals {} assists {}",
        p.label(),
        p.stats.appearances,
        p.stats.goals,
        p.stats.assists
    );
    if let Some(cs) = p.stats.clean_sheets {
        out.push_str(&format!(" clean sheets {cs}"));
    }
    let ratings = &p.ratings;
    out.push_str(&format!(
        "\n  rating {} | value {} | pulse {} | contract {:?}",
        ratings.rating.map_or("-".into(), |r| r.to_string()),
        ratings.value_for_money.map_or("-".into(), |v| format!("{v:+}")),
        ratings.fan_pulse.map_or("-".into(), |v| v.to_string()),
        p.contract
    ));
    if let Some(c) = &p.comment {
        out.push_str(&format!("\n  \"{c}\""));
    }
    out
}

pub fn render_rumors(filter: RumorFilter, rumors: &[TransferRumor]) -> String {
    let title = match filter {
        RumorFilter::All => "rumors".to_string(),
        other => format!("{other} rumors"),
    };
    if rumors.is_empty() {
        return format!("no {title}");
    }
    let lines = rumors
        .iter()
        .map(|r| {
            format!(
                "{}{:<4} {:<20} {} -> {}  {:.1}m  {:>3}%  {}  {}",
                if r.tracked { "*" } else { " " },
                r.id,
                r.player_name,
                r.from_club,
                r.to_club,
                r.fee_millions,
                r.likelihood,
                r.status,
                r.reported_on
            )
        })
        .collect::<Vec<_>>()
        .join("\n");
    format!("{title}:\n{lines}")
}

pub fn render_history(player_id: &str, records: &[AssessmentRecord]) -> String {
    if records.is_empty() {
        return format!("no assessments recorded for {player_id}");
    }
    let mut out = format!("assessments for {player_id}:");
    for r in records {
        out.push_str(&format!(
            "\n  {}  rating {}  vfm {}  {}",
            r.recorded_at,
            r.rating.map_or("-".into(), |v| v.to_string()),
            r.value_for_money.map_or("-".into(), |v| format!("{v:+}")),
            r.comment.as_deref().unwrap_or("")
        ));
    }
    out
}

pub fn render_update(update: &UiUpdate) -> String {
    match update {
        UiUpdate::Squad(view) => render_squad(view),
        UiUpdate::PlayerCard(p) => render_player(p),
        UiUpdate::Rumors { filter, rumors } => render_rumors(*filter, rumors),
        UiUpdate::History { player_id, records } => render_history(player_id, records),
        UiUpdate::Notice(msg) => format!("-- {msg}"),
        UiUpdate::Error(msg) => format!("!! {msg}"),
    }
}

// ---------------------------------------------------------------------------
// Console loop
// ---------------------------------------------------------------------------

/// Read commands from stdin and print updates until `quit` or EOF.
pub async fn run(
    mut ui_rx: mpsc::Receiver<UiUpdate>,
    cmd_tx: mpsc::Sender<UserCommand>,
) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("{HELP}");

    loop {
        tokio::select! {
            update = ui_rx.recv() => {
                match update {
                    Some(update) => println!("{}", render_update(&update)),
                    None => {
                        debug!("UI channel closed");
                        break;
                    }
                }
            }

            line = lines.next_line() => {
                let Some(line) = line? else {
                    info!("stdin closed, quitting");
                    let _ = cmd_tx.send(UserCommand::Quit).await;
                    break;
                };
                match parse_command(&line) {
                    Ok(Some(UserCommand::Quit)) => {
                        let _ = cmd_tx.send(UserCommand::Quit).await;
                        break;
                    }
                    Ok(Some(cmd)) => {
                        if cmd_tx.send(cmd).await.is_err() {
                            break;
                        }
                    }
                    Ok(None) if !line.trim().is_empty() => println!("{HELP}"),
                    Ok(None) => {}
                    Err(msg) => println!("!! {msg}"),
                }
            }
        }
    }

    Ok(())
}
