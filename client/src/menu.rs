//! Interactive prompt loops: login, the command menu, and question play
//!
//! Answer indices are 0-based on the wire; everything shown to or read
//! from the player is 1-based.

use crate::network::{ClientError, Connection};
use shared::{ClientCommand, ServerReply, DATA_DELIMITER};
use std::io::{self, Write};

/// Prompts for credentials until the server accepts them.
pub fn login(conn: &mut Connection) -> Result<(), ClientError> {
    loop {
        let username = prompt("Enter Username: ")?;
        let password = prompt("Enter Password: ")?;
        let payload = format!("{}{}{}", username, DATA_DELIMITER, password);

        match conn.request(ClientCommand::Login, &payload)? {
            (ServerReply::LoginOk, _) => {
                println!("Login successful.");
                return Ok(());
            }
            (ServerReply::LoginFailed, reason) if !reason.is_empty() => {
                println!("Login refused: {}", reason);
            }
            (ServerReply::LoginFailed, _) => {
                println!("Login refused for an unknown reason.");
            }
            (reply, payload) => {
                println!("Unexpected reply {:?}: {}", reply, payload);
            }
        }
    }
}

/// The main command loop. Returns after logout.
pub fn run(conn: &mut Connection) -> Result<(), ClientError> {
    print_menu();
    loop {
        let command = prompt("Enter your desired command: ")?.to_lowercase();
        match command.as_str() {
            "question" => play_question(conn)?,
            "score" => show_score(conn)?,
            "highscore" => show_highscore(conn)?,
            "logged" => show_logged(conn)?,
            "menu" => print_menu(),
            "logout" => {
                conn.send(ClientCommand::Logout, "")?;
                println!("Logged out.");
                return Ok(());
            }
            _ => println!("Command not recognized, please try again."),
        }
    }
}

fn print_menu() {
    println!("Available commands:");
    println!("  question  - get a trivia question");
    println!("  score     - see your score");
    println!("  highscore - see the highscore table");
    println!("  logged    - see logged-in players");
    println!("  menu      - show this menu");
    println!("  logout    - log out of the game");
}

/// Fetches a question, reads an answer (1-4), submits it, and reports the
/// verdict. Repeats as long as the player wants another round.
fn play_question(conn: &mut Connection) -> Result<(), ClientError> {
    loop {
        let (reply, payload) = conn.request(ClientCommand::GetQuestion, "")?;
        match reply {
            ServerReply::Question => {}
            ServerReply::NoQuestions => {
                println!("No questions left.");
                return show_highscore(conn);
            }
            other => {
                println!("Unexpected reply {:?}: {}", other, payload);
                return Ok(());
            }
        }

        let fields: Vec<&str> = payload.split(DATA_DELIMITER).collect();
        let [id, text, answers @ ..] = fields.as_slice() else {
            println!("The server sent a malformed question.");
            return Ok(());
        };
        if answers.len() != 4 {
            println!("The server sent a malformed question.");
            return Ok(());
        }

        println!("Question {}: {}", id, text);
        for (number, answer) in answers.iter().enumerate() {
            println!("  {}. {}", number + 1, answer);
        }

        let choice = read_answer_number()?;
        let submission = format!("{}{}{}", id, DATA_DELIMITER, choice - 1);
        match conn.request(ClientCommand::SendAnswer, &submission)? {
            (ServerReply::Correct, _) => println!("Answer correct!"),
            (ServerReply::Wrong, index) => match index.parse::<usize>() {
                Ok(index) => println!("Wrong answer. The correct answer was {}.", index + 1),
                Err(_) => println!("Wrong answer."),
            },
            (ServerReply::Error, message) => println!("{}", message),
            (reply, payload) => println!("Unexpected reply {:?}: {}", reply, payload),
        }

        if !read_yes_no("Would you like to keep playing? (y/n) ")? {
            return Ok(());
        }
    }
}

fn show_score(conn: &mut Connection) -> Result<(), ClientError> {
    if let (ServerReply::YourScore, score) = conn.request(ClientCommand::MyScore, "")? {
        println!("Your score: {}", score);
    }
    Ok(())
}

fn show_highscore(conn: &mut Connection) -> Result<(), ClientError> {
    if let (ServerReply::AllScore, table) = conn.request(ClientCommand::Highscore, "")? {
        println!("High score table:\n{}", table);
    }
    Ok(())
}

fn show_logged(conn: &mut Connection) -> Result<(), ClientError> {
    if let (ServerReply::LoggedAnswer, names) = conn.request(ClientCommand::Logged, "")? {
        println!("Logged players: {}", names);
    }
    Ok(())
}

/// Reads an answer number, insisting on an integer in 1..=4.
fn read_answer_number() -> Result<usize, ClientError> {
    loop {
        let input = prompt("Enter your answer: ")?;
        match input.parse::<usize>() {
            Ok(n) if (1..=4).contains(&n) => return Ok(n),
            _ => println!("Invalid answer. Answer must be 1-4."),
        }
    }
}

fn read_yes_no(question: &str) -> Result<bool, ClientError> {
    loop {
        match prompt(question)?.to_lowercase().as_str() {
            "y" => return Ok(true),
            "n" => return Ok(false),
            _ => println!("Unexpected input, try again."),
        }
    }
}

fn prompt(label: &str) -> Result<String, ClientError> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}
